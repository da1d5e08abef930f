//! 校验器：执行前的唯一安全闸口
//!
//! 三道检查按序执行：必填字段、选择器 denylist、选择器存在性探测。
//! 不通过是预期结果，以 ValidationResult 值返回，不走错误通道。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::model::Action;

/// 破坏性操作的选择器片段黑名单（小写子串匹配）
const DENYLIST_PATTERNS: &[&str] = &[
    "logout",
    "log-out",
    "sign-out",
    "signout",
    "delete",
    "remove",
    "submit",
    "purchase",
    "buy",
    "payment",
    "checkout",
    "account",
    "settings",
    "preferences",
];

/// 页面探测边界：询问选择器当前是否存在，探测失败视为不存在
#[async_trait]
pub trait PageProbe: Send + Sync {
    async fn selector_exists(&self, selector: &str) -> bool;
}

/// 校验结论
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub reason: String,
}

impl ValidationResult {
    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
        }
    }
}

/// 安全校验器
pub struct Validator {
    probe: Arc<dyn PageProbe>,
}

impl Validator {
    pub fn new(probe: Arc<dyn PageProbe>) -> Self {
        Self { probe }
    }

    /// 按操作种类穷举校验；通过返回 passed_all_checks
    pub async fn validate(&self, action: &Action) -> ValidationResult {
        let selector = match action {
            Action::Click { selector }
            | Action::TypeText { selector, .. }
            | Action::WaitFor { selector }
            | Action::Extract { selector } => match selector {
                Some(sel) => Some(sel.as_str()),
                None => {
                    return ValidationResult::invalid(format!(
                        "missing_selector_for_{}",
                        action.kind()
                    ));
                }
            },
            Action::Navigate { url } => {
                if url.is_none() {
                    return ValidationResult::invalid("missing_url_for_navigate");
                }
                None
            }
            Action::Press { key } => {
                if key.is_none() {
                    return ValidationResult::invalid("missing_key_for_press");
                }
                None
            }
        };

        if let Some(sel) = selector {
            if is_denylisted(sel) {
                return ValidationResult::invalid("selector_matches_denylist_pattern");
            }
            if !self.probe.selector_exists(sel).await {
                return ValidationResult::invalid(format!("selector_not_found_{}", sel));
            }
        }

        ValidationResult {
            valid: true,
            reason: "passed_all_checks".to_string(),
        }
    }
}

fn is_denylisted(selector: &str) -> bool {
    let lower = selector.to_lowercase();
    DENYLIST_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}
