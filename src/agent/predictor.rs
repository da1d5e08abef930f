//! 预测器：基于 Markov 转移计数生成候选下一步
//!
//! 历史 >= 2 步且开启二阶时先查二阶表，命中即用；否则回退一阶。
//! 置信度 = count / 该上下文全部转移计数之和，分母在截断 top_k 之前求出。

use std::sync::Arc;

use serde::Serialize;

use crate::error::AgentError;
use crate::model::{Action, Signature};
use crate::storage::TransitionStore;

/// 预测来源：用的哪一阶上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    FirstOrder,
    SecondOrder,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::FirstOrder => "first_order",
            PredictionSource::SecondOrder => "second_order",
        }
    }
}

/// 一条候选预测
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub action: Action,
    pub signature: Signature,
    pub confidence: f64,
    pub count: i64,
    pub source: PredictionSource,
}

/// Markov 预测器
pub struct Predictor {
    store: Arc<TransitionStore>,
    top_k: usize,
    use_second_order: bool,
}

impl Predictor {
    pub fn new(store: Arc<TransitionStore>, top_k: usize, use_second_order: bool) -> Self {
        Self {
            store,
            top_k,
            use_second_order,
        }
    }

    /// 从历史预测下一步：优先二阶，无二阶数据时回退一阶，空历史返回空
    pub fn predict(&self, history: &[Action]) -> Result<Vec<Prediction>, AgentError> {
        let Some(current) = history.last() else {
            return Ok(Vec::new());
        };

        if self.use_second_order && history.len() >= 2 {
            let prev = &history[history.len() - 2];
            let second = self.predict_second_order(prev, current)?;
            if !second.is_empty() {
                return Ok(second);
            }
        }

        self.predict_first_order(current)
    }

    /// 一阶预测：只看最近一步
    pub fn predict_first_order(&self, current: &Action) -> Result<Vec<Prediction>, AgentError> {
        let rows = self.store.first_order_transitions(&current.signature())?;
        self.to_predictions(rows, PredictionSource::FirstOrder)
    }

    /// 二阶预测：看最近两步组成的上下文对
    pub fn predict_second_order(
        &self,
        prev: &Action,
        current: &Action,
    ) -> Result<Vec<Prediction>, AgentError> {
        let rows = self
            .store
            .second_order_transitions(&prev.signature(), &current.signature())?;
        self.to_predictions(rows, PredictionSource::SecondOrder)
    }

    /// 计数行 -> 预测：先对全部行求分母，再截断 top_k；签名解码失败向上传播
    fn to_predictions(
        &self,
        rows: Vec<(Signature, i64)>,
        source: PredictionSource,
    ) -> Result<Vec<Prediction>, AgentError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let total: i64 = rows.iter().map(|(_, count)| *count).sum();
        rows.into_iter()
            .take(self.top_k)
            .map(|(signature, count)| {
                let action = Action::from_canonical(&signature)?;
                Ok(Prediction {
                    action,
                    signature,
                    confidence: count as f64 / total as f64,
                    count,
                    source,
                })
            })
            .collect()
    }
}
