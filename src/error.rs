//! Agent 错误类型
//!
//! 只有「致命」故障走错误通道：编码解析失败与存储失败必须向上传播；
//! 校验不通过与执行失败属于预期结果，以 ValidationResult / ExecutionResult 值返回，不在此列。

use thiserror::Error;

/// 决策流水线中可能出现的致命错误（编码、存储、观测边界）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 规范化编码损坏：禁止静默降级，当前调用直接失败
    #[error("Action decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// 存储层故障：吞掉会丢失计数、污染模型，必须冒泡
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Observe failed: {0}")]
    Observe(String),

    #[error("Browser error: {0}")]
    Browser(String),
}
