//! 操作抽象：六种浏览器操作的封闭枚举与规范化签名
//!
//! 签名 = 键名排序、省略缺失字段的 JSON 编码；语义相同的操作无论字段顺序如何，
//! 签名字节一致，作为 Markov 转移表的唯一键。字段全部为 Option：缺必填字段的
//! 编码也能解析成功，必填校验统一延迟到 Validator（单一安全闸口）。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AgentError;

/// 规范化签名（排序 JSON 字符串）
pub type Signature = String;

/// 浏览器操作（serde tag 为 `type`，取值 navigate/click/type/press/wait_for/extract）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Navigate {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Click {
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    #[serde(rename = "type")]
    TypeText {
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Press {
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    WaitFor {
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    Extract {
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
}

impl Action {
    /// 操作种类名（与 serde tag 取值一致），用于原因字符串与日志
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::TypeText { .. } => "type",
            Action::Press { .. } => "press",
            Action::WaitFor { .. } => "wait_for",
            Action::Extract { .. } => "extract",
        }
    }

    /// 选择器字段（仅 click/type/wait_for/extract 有）
    pub fn selector(&self) -> Option<&str> {
        match self {
            Action::Click { selector }
            | Action::TypeText { selector, .. }
            | Action::WaitFor { selector }
            | Action::Extract { selector } => selector.as_deref(),
            Action::Navigate { .. } | Action::Press { .. } => None,
        }
    }

    /// 规范化编码：显式按键名升序写入 Map，不依赖任何 serde 的键序行为，
    /// 保证签名字节稳定；缺失（None）字段直接省略
    pub fn canonical_json(&self) -> Signature {
        fn put(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
            if let Some(v) = value {
                map.insert(key.to_string(), Value::String(v.clone()));
            }
        }
        let mut map = Map::new();
        // 每个分支的 insert 顺序即该分支全部键名的字典序
        match self {
            Action::Navigate { url } => {
                map.insert("type".to_string(), Value::String("navigate".to_string()));
                put(&mut map, "url", url);
            }
            Action::Click { selector } => {
                put(&mut map, "selector", selector);
                map.insert("type".to_string(), Value::String("click".to_string()));
            }
            Action::TypeText { selector, text } => {
                put(&mut map, "selector", selector);
                put(&mut map, "text", text);
                map.insert("type".to_string(), Value::String("type".to_string()));
            }
            Action::Press { key } => {
                put(&mut map, "key", key);
                map.insert("type".to_string(), Value::String("press".to_string()));
            }
            Action::WaitFor { selector } => {
                put(&mut map, "selector", selector);
                map.insert("type".to_string(), Value::String("wait_for".to_string()));
            }
            Action::Extract { selector } => {
                put(&mut map, "selector", selector);
                map.insert("type".to_string(), Value::String("extract".to_string()));
            }
        }
        Value::Object(map).to_string()
    }

    /// 签名即规范化编码本身
    pub fn signature(&self) -> Signature {
        self.canonical_json()
    }

    /// 从规范化编码解析；损坏的编码返回 Decode 错误，绝不静默兜底
    pub fn from_canonical(encoded: &str) -> Result<Action, AgentError> {
        Ok(serde_json::from_str(encoded)?)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({}", self.kind())?;
        match self {
            Action::Navigate { url } => {
                if let Some(url) = url {
                    write!(f, ", url={}", url)?;
                }
            }
            Action::TypeText { selector, text } => {
                if let Some(sel) = selector {
                    write!(f, ", sel={}", sel)?;
                }
                if let Some(text) = text {
                    let preview: String = text.chars().take(20).collect();
                    write!(f, ", text={}...", preview)?;
                }
            }
            Action::Press { key } => {
                if let Some(key) = key {
                    write!(f, ", key={}", key)?;
                }
            }
            Action::Click { selector } | Action::WaitFor { selector } | Action::Extract { selector } => {
                if let Some(sel) = selector {
                    write!(f, ", sel={}", sel)?;
                }
            }
        }
        write!(f, ")")
    }
}

/// 导航到 URL
pub fn navigate(url: impl Into<String>) -> Action {
    Action::Navigate { url: Some(url.into()) }
}

/// 点击匹配选择器的元素
pub fn click(selector: impl Into<String>) -> Action {
    Action::Click { selector: Some(selector.into()) }
}

/// 向匹配选择器的元素输入文本
pub fn type_text(selector: impl Into<String>, text: impl Into<String>) -> Action {
    Action::TypeText {
        selector: Some(selector.into()),
        text: Some(text.into()),
    }
}

/// 按下键盘按键
pub fn press(key: impl Into<String>) -> Action {
    Action::Press { key: Some(key.into()) }
}

/// 等待匹配选择器的元素出现
pub fn wait_for(selector: impl Into<String>) -> Action {
    Action::WaitFor { selector: Some(selector.into()) }
}

/// 提取匹配选择器元素的文本
pub fn extract(selector: impl Into<String>) -> Action {
    Action::Extract { selector: Some(selector.into()) }
}
