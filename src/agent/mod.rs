//! 决策层：Predictor、Planner、Validator、Metrics 与 Agent 主循环

pub mod executor;
pub mod loop_;
pub mod metrics;
pub mod observer;
pub mod planner;
pub mod predictor;
pub mod validator;

pub use executor::{Actuator, ExecutionResult};
pub use loop_::{AgentLoop, ExecutionReport, StepReport};
pub use metrics::{Metrics, MetricsSnapshot};
pub use observer::Observer;
pub use planner::{Plan, Planner};
pub use predictor::{Prediction, PredictionSource, Predictor};
pub use validator::{PageProbe, ValidationResult, Validator};
