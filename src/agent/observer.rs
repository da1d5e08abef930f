//! 观测边界：采集页面状态快照

use async_trait::async_trait;

use crate::error::AgentError;
use crate::model::PageState;

/// 环境观测器边界：读不到状态属于致命错误，向上传播
#[async_trait]
pub trait Observer: Send + Sync {
    async fn observe(&self) -> Result<PageState, AgentError>;
}
