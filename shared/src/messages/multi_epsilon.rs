//! `compute-multi-epsilon` request and response bodies
//!
//! Every per-epsilon field is optional on the wire: the service reports a
//! failed epsilon through `dp_error` instead of failing the whole request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MultiEpsilonRequest {
    pub values: Vec<f64>,
    pub epsilons: Vec<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ModelPerformance {
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub loss: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EpsilonReport {
    pub epsilon: f64,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub count: Option<i64>,
    /// Noisy histogram keyed by bin label ("lo-hi")
    #[serde(default)]
    pub histogram: BTreeMap<String, i64>,
    #[serde(default)]
    pub dp_error: Option<String>,
    #[serde(default)]
    pub model_performance: Option<ModelPerformance>,
}

impl EpsilonReport {
    /// Whether the service produced DP statistics for this epsilon
    pub fn succeeded(&self) -> bool {
        self.dp_error.is_none() && self.mean.is_some()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct MultiEpsilonResponse {
    pub results: Vec<EpsilonReport>,
}
