//! Chrome 会话：Actuator / Observer / PageProbe 的真实实现
//!
//! 需启用 feature "browser" 且系统已安装 Chrome/Chromium。
//! headless_chrome 是同步 API，全部调用经 spawn_blocking 进入阻塞线程池，
//! 不占用异步运行时。整个进程共用一个 Tab，操作按序执行。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::agent::{Actuator, ExecutionResult, Observer, PageProbe};
use crate::config::BrowserSection;
use crate::error::AgentError;
use crate::model::{Action, PageState};

/// 持久 Chrome 会话
pub struct ChromeSession {
    /// 持有以保持 Chrome 进程存活
    _browser: Browser,
    tab: Arc<Tab>,
    action_timeout: Duration,
    probe_timeout: Duration,
}

impl ChromeSession {
    /// 启动 Chrome 并打开一个 Tab
    pub fn launch(cfg: &BrowserSection) -> Result<Self, AgentError> {
        let options = LaunchOptions {
            headless: cfg.headless,
            window_size: Some((1280, 900)),
            args: vec![
                std::ffi::OsStr::new("--no-first-run"),
                std::ffi::OsStr::new("--no-default-browser-check"),
                std::ffi::OsStr::new("--disable-infobars"),
            ],
            idle_browser_timeout: Duration::from_secs(120),
            ..Default::default()
        };

        let browser = Browser::new(options)
            .map_err(|e| AgentError::Browser(format!("Chrome launch failed: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AgentError::Browser(format!("Browser tab failed: {}", e)))?;

        Ok(Self {
            _browser: browser,
            tab,
            action_timeout: Duration::from_millis(cfg.action_timeout_ms),
            probe_timeout: Duration::from_millis(cfg.probe_timeout_ms),
        })
    }
}

/// 错误串截断到 100 字符，避免报告里塞进整页堆栈
fn error_text(e: impl std::fmt::Display) -> String {
    e.to_string().chars().take(100).collect()
}

/// 在阻塞线程里执行一个操作；失败封装为 ExecutionResult，不向外抛
fn run_action(tab: &Tab, action: &Action, timeout: Duration) -> ExecutionResult {
    let outcome = (|| -> Result<Option<String>, String> {
        match action {
            Action::Navigate { url } => {
                let url = url.as_deref().ok_or("missing_url_for_navigate")?;
                tab.navigate_to(url)
                    .map_err(|e| format!("navigate_failed_{}", e))?;
                tab.wait_for_element("body")
                    .map_err(|e| format!("page_load_failed_{}", e))?;
                Ok(None)
            }
            Action::Click { selector } => {
                let sel = selector.as_deref().ok_or("missing_selector_for_click")?;
                tab.wait_for_element_with_custom_timeout(sel, timeout)
                    .map_err(|e| format!("element_not_found_{}", e))?
                    .click()
                    .map_err(|e| format!("click_failed_{}", e))?;
                Ok(None)
            }
            Action::TypeText { selector, text } => {
                let sel = selector.as_deref().ok_or("missing_selector_for_type")?;
                let text = text.as_deref().ok_or("missing_text_for_type")?;
                let element = tab
                    .wait_for_element_with_custom_timeout(sel, timeout)
                    .map_err(|e| format!("element_not_found_{}", e))?;
                element
                    .click()
                    .map_err(|e| format!("focus_failed_{}", e))?;
                // 填充语义：先清空焦点元素已有内容再输入
                tab.evaluate(
                    "if (document.activeElement && 'value' in document.activeElement) { document.activeElement.value = ''; }",
                    false,
                )
                .map_err(|e| format!("clear_failed_{}", e))?;
                tab.type_str(text)
                    .map_err(|e| format!("type_failed_{}", e))?;
                Ok(None)
            }
            Action::Press { key } => {
                let key = key.as_deref().ok_or("missing_key_for_press")?;
                tab.press_key(key)
                    .map_err(|e| format!("press_failed_{}", e))?;
                Ok(None)
            }
            Action::WaitFor { selector } => {
                let sel = selector.as_deref().ok_or("missing_selector_for_wait_for")?;
                tab.wait_for_element_with_custom_timeout(sel, timeout)
                    .map_err(|e| format!("wait_timeout_{}", e))?;
                Ok(None)
            }
            Action::Extract { selector } => {
                let sel = selector.as_deref().ok_or("missing_selector_for_extract")?;
                let element = tab
                    .wait_for_element_with_custom_timeout(sel, timeout)
                    .map_err(|e| format!("element_not_found_{}", e))?;
                let text = element
                    .get_inner_text()
                    .map_err(|e| format!("get_text_failed_{}", e))?;
                Ok(Some(text))
            }
        }
    })();

    match outcome {
        Ok(Some(text)) => ExecutionResult::ok_with_text(text),
        Ok(None) => ExecutionResult::ok(),
        Err(e) => ExecutionResult::failed(error_text(e)),
    }
}

#[async_trait]
impl Actuator for ChromeSession {
    async fn execute(&self, action: &Action) -> ExecutionResult {
        let tab = Arc::clone(&self.tab);
        let action = action.clone();
        let timeout = self.action_timeout;

        tracing::debug!("browser execute: {}", action);
        match tokio::task::spawn_blocking(move || run_action(&tab, &action, timeout)).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::failed(error_text(format!("task_join_{}", e))),
        }
    }
}

#[async_trait]
impl Observer for ChromeSession {
    async fn observe(&self) -> Result<PageState, AgentError> {
        let tab = Arc::clone(&self.tab);
        let state = tokio::task::spawn_blocking(move || {
            let url = tab.get_url();
            let title = tab.get_title().unwrap_or_default();
            PageState::new(url, title)
        })
        .await
        .map_err(|e| AgentError::Observe(format!("task_join_{}", e)))?;
        Ok(state)
    }
}

#[async_trait]
impl PageProbe for ChromeSession {
    async fn selector_exists(&self, selector: &str) -> bool {
        let tab = Arc::clone(&self.tab);
        let selector = selector.to_string();
        let timeout = self.probe_timeout;
        tokio::task::spawn_blocking(move || {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .is_ok()
        })
        .await
        .unwrap_or(false)
    }
}
