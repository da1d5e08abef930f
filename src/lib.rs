//! ThirdLayer - 浏览器工作流预测智能体
//!
//! 从真实操作序列学习 Markov 转移模型，自主预测、校验并执行下一步浏览器操作。
//!
//! 模块划分：
//! - **agent**: 决策层（Predictor、Planner、Validator、Metrics 与主循环）
//! - **browser**: Chrome 会话，Actuator / Observer / PageProbe 的真实实现（feature = "browser"）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **model**: 操作枚举、规范化签名与页面状态
//! - **storage**: SQLite 转移计数与操作日志

pub mod agent;
#[cfg(feature = "browser")]
pub mod browser;
pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod storage;

pub use agent::AgentLoop;
pub use error::AgentError;
pub use model::{Action, PageState};
pub use storage::TransitionStore;
