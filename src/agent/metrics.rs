//! 运行指标：预测准确率、执行成功率、平均置信度、决策耗时
//!
//! 所有比率 getter 对零分母返回 0.0，不会除零。

use std::time::Instant;

use serde::Serialize;

/// 指标累加器，由 AgentLoop 独占持有
pub struct Metrics {
    total_predictions: u64,
    correct_predictions: u64,
    total_executions: u64,
    successful_executions: u64,
    unsafe_filtered: u64,
    total_confidence: f64,
    /// 每步决策耗时（秒）
    decision_times: Vec<f64>,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_predictions: 0,
            correct_predictions: 0,
            total_executions: 0,
            successful_executions: 0,
            unsafe_filtered: 0,
            total_confidence: 0.0,
            decision_times: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// 记录一次预测；correct 为 None 表示没有基准答案可比对
    pub fn record_prediction(&mut self, correct: Option<bool>) {
        self.total_predictions += 1;
        if correct == Some(true) {
            self.correct_predictions += 1;
        }
    }

    pub fn record_execution(&mut self, success: bool) {
        self.total_executions += 1;
        if success {
            self.successful_executions += 1;
        }
    }

    pub fn record_unsafe_filtered(&mut self) {
        self.unsafe_filtered += 1;
    }

    pub fn record_confidence(&mut self, confidence: f64) {
        self.total_confidence += confidence;
    }

    pub fn record_decision_time(&mut self, seconds: f64) {
        self.decision_times.push(seconds);
    }

    pub fn prediction_accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            return 0.0;
        }
        self.correct_predictions as f64 / self.total_predictions as f64
    }

    pub fn execution_success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            return 0.0;
        }
        self.successful_executions as f64 / self.total_executions as f64
    }

    pub fn average_confidence(&self) -> f64 {
        if self.total_predictions == 0 {
            return 0.0;
        }
        self.total_confidence / self.total_predictions as f64
    }

    /// 平均决策耗时（秒）
    pub fn average_decision_time(&self) -> f64 {
        if self.decision_times.is_empty() {
            return 0.0;
        }
        self.decision_times.iter().sum::<f64>() / self.decision_times.len() as f64
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_predictions: self.total_predictions,
            correct_predictions: self.correct_predictions,
            prediction_accuracy: self.prediction_accuracy(),
            total_executions: self.total_executions,
            successful_executions: self.successful_executions,
            execution_success_rate: self.execution_success_rate(),
            average_confidence: self.average_confidence(),
            unsafe_filtered: self.unsafe_filtered,
            average_decision_time_ms: self.average_decision_time() * 1000.0,
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 序列化快照，上报与日志用
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_predictions: u64,
    pub correct_predictions: u64,
    pub prediction_accuracy: f64,
    pub total_executions: u64,
    pub successful_executions: u64,
    pub execution_success_rate: f64,
    pub average_confidence: f64,
    pub unsafe_filtered: u64,
    pub average_decision_time_ms: f64,
    pub uptime_seconds: f64,
}
