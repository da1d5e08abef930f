//! 执行边界：Actuator trait 与执行结果
//!
//! 执行失败是预期结果，封装在 ExecutionResult 里返回；trait 本身不返回错误。

use async_trait::async_trait;
use serde::Serialize;

use crate::model::Action;

/// 单次执行的结果
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub error: Option<String>,
    /// extract 操作取到的文本
    pub extracted_text: Option<String>,
}

impl ExecutionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            extracted_text: None,
        }
    }

    pub fn ok_with_text(text: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            extracted_text: Some(text.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            extracted_text: None,
        }
    }
}

/// 操作执行器边界：真实实现驱动浏览器，测试实现计数或模拟失败
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn execute(&self, action: &Action) -> ExecutionResult;
}
