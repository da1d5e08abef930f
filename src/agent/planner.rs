//! 规划器：按置信度阈值决定执行与否
//!
//! 纯函数决策，不做 IO。边界取等号：置信度恰好等于阈值时执行。

use serde::Serialize;

use crate::agent::predictor::Prediction;

/// 决策结果，reason 为机器可读的蛇形字符串
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub prediction: Option<Prediction>,
    pub should_execute: bool,
    pub reason: String,
}

/// 阈值规划器
pub struct Planner {
    confidence_threshold: f64,
}

impl Planner {
    pub fn new(confidence_threshold: f64) -> Self {
        Self { confidence_threshold }
    }

    /// 从候选里取第一条（已按置信度降序），过阈值则执行
    pub fn plan(&self, predictions: &[Prediction]) -> Plan {
        let Some(top) = predictions.first() else {
            return Plan {
                prediction: None,
                should_execute: false,
                reason: "no_predictions_available".to_string(),
            };
        };

        if top.confidence < self.confidence_threshold {
            return Plan {
                prediction: Some(top.clone()),
                should_execute: false,
                reason: format!(
                    "confidence_too_low_{:.2}_below_{}",
                    top.confidence, self.confidence_threshold
                ),
            };
        }

        Plan {
            prediction: Some(top.clone()),
            should_execute: true,
            reason: format!("confidence_above_threshold_{:.2}", top.confidence),
        }
    }
}
