//! Agent 决策主循环
//!
//! 每步固定顺序：observe -> predict -> plan -> validate -> execute -> record。
//! 低置信度跳过或被校验拦下的步，既不碰执行器也不写历史与计数；
//! 只有确认执行成功的操作才进入历史并更新转移表，模型不被失败污染。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use crate::agent::executor::{Actuator, ExecutionResult};
use crate::agent::metrics::{Metrics, MetricsSnapshot};
use crate::agent::observer::Observer;
use crate::agent::planner::{Plan, Planner};
use crate::agent::predictor::{Prediction, Predictor};
use crate::agent::validator::{PageProbe, ValidationResult, Validator};
use crate::config::AgentSection;
use crate::error::AgentError;
use crate::model::Action;
use crate::storage::TransitionStore;

/// 一步的完整决策记录，JSON 可序列化，供日志与演示输出
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 步开始时刻（毫秒时间戳）
    pub timestamp: i64,
    /// 执行前观测到的页面 URL
    pub url: String,
    pub predictions: Vec<Prediction>,
    pub plan: Plan,
    pub validation: Option<ValidationResult>,
    pub execution: Option<ExecutionReport>,
    /// 与基准答案的比对结果，无基准时为 None
    pub ground_truth_match: Option<bool>,
    pub decision_time_ms: f64,
}

/// 执行环节的记录：没尝试时给原因，尝试了给结果
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub attempted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// 演练模式下本来会执行的操作
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_execute: Option<Action>,
    #[serde(flatten)]
    pub result: Option<ExecutionResult>,
}

impl ExecutionReport {
    fn skipped(reason: &str) -> Self {
        Self {
            attempted: false,
            reason: Some(reason.to_string()),
            would_execute: None,
            result: None,
        }
    }

    fn dry_run(action: &Action) -> Self {
        Self {
            attempted: false,
            reason: Some("dry_run_mode".to_string()),
            would_execute: Some(action.clone()),
            result: None,
        }
    }

    fn attempted(result: ExecutionResult) -> Self {
        Self {
            attempted: true,
            reason: None,
            would_execute: None,
            result: Some(result),
        }
    }
}

/// 决策循环：持有全部组件与操作历史
pub struct AgentLoop {
    store: Arc<TransitionStore>,
    observer: Arc<dyn Observer>,
    actuator: Arc<dyn Actuator>,
    predictor: Predictor,
    planner: Planner,
    validator: Validator,
    metrics: Metrics,
    history: Vec<Action>,
    dry_run: bool,
}

impl AgentLoop {
    pub fn new(
        store: Arc<TransitionStore>,
        observer: Arc<dyn Observer>,
        actuator: Arc<dyn Actuator>,
        probe: Arc<dyn PageProbe>,
        cfg: &AgentSection,
    ) -> Self {
        let predictor = Predictor::new(Arc::clone(&store), cfg.top_k, cfg.use_second_order);
        Self {
            store,
            observer,
            actuator,
            predictor,
            planner: Planner::new(cfg.confidence_threshold),
            validator: Validator::new(probe),
            metrics: Metrics::new(),
            history: Vec::new(),
            dry_run: cfg.dry_run,
        }
    }

    /// 录制模式下手动把确认完成的操作加进历史
    pub fn push_history(&mut self, action: Action) {
        self.history.push(action);
    }

    pub fn history(&self) -> &[Action] {
        &self.history
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 执行一步决策；ground_truth 给出时把预测是否命中计入准确率
    pub async fn step(&mut self, ground_truth: Option<&Action>) -> Result<StepReport, AgentError> {
        let step_start = Instant::now();

        let state = self.observer.observe().await?;
        let predictions = self.predictor.predict(&self.history)?;
        let plan = self.planner.plan(&predictions);

        tracing::debug!(
            "step: url={} candidates={} plan={}",
            state.url,
            predictions.len(),
            plan.reason
        );

        let mut report = StepReport {
            timestamp: Utc::now().timestamp_millis(),
            url: state.url.clone(),
            predictions,
            plan: plan.clone(),
            validation: None,
            execution: None,
            ground_truth_match: None,
            decision_time_ms: 0.0,
        };

        if let Some(prediction) = &plan.prediction {
            self.metrics.record_confidence(prediction.confidence);
            match ground_truth {
                Some(expected) => {
                    let matched = prediction.signature == expected.signature();
                    self.metrics.record_prediction(Some(matched));
                    report.ground_truth_match = Some(matched);
                }
                None => self.metrics.record_prediction(None),
            }
        }

        if plan.should_execute {
            if let Some(prediction) = plan.prediction {
                let validation = self.validator.validate(&prediction.action).await;
                if !validation.valid {
                    self.metrics.record_unsafe_filtered();
                    tracing::warn!(
                        "action filtered: {} ({})",
                        prediction.action,
                        validation.reason
                    );
                    report.validation = Some(validation);
                    report.execution = Some(ExecutionReport::skipped("validation_failed"));
                } else if self.dry_run {
                    tracing::info!("dry run, would execute: {}", prediction.action);
                    report.validation = Some(validation);
                    report.execution = Some(ExecutionReport::dry_run(&prediction.action));
                } else {
                    report.validation = Some(validation);
                    let result = self.actuator.execute(&prediction.action).await;
                    self.metrics.record_execution(result.success);
                    if result.success {
                        tracing::info!("executed: {}", prediction.action);
                        self.confirm(&prediction.action, &state.url)?;
                    } else {
                        tracing::warn!(
                            "execution failed: {} ({})",
                            prediction.action,
                            result.error.as_deref().unwrap_or("unknown")
                        );
                    }
                    report.execution = Some(ExecutionReport::attempted(result));
                }
            }
        }

        let decision_time = step_start.elapsed().as_secs_f64();
        self.metrics.record_decision_time(decision_time);
        report.decision_time_ms = decision_time * 1000.0;

        Ok(report)
    }

    /// 确认成功后的唯一状态落点：写操作日志、更新一阶/二阶计数、推进历史
    fn confirm(&mut self, action: &Action, url: &str) -> Result<(), AgentError> {
        self.store.record_action(action, Some(url), true)?;
        if let Some(last) = self.history.last() {
            self.store.record_transition_first_order(last, action)?;
        }
        if self.history.len() > 1 {
            let prev = &self.history[self.history.len() - 2];
            let last = &self.history[self.history.len() - 1];
            self.store.record_transition_second_order(prev, last, action)?;
        }
        self.history.push(action.clone());
        Ok(())
    }
}
