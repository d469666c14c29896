//! `compute-error-bars` request and response bodies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{ColumnName, Record, Statistic};

/// Request for `num_simulations` repeated draws of the DP mechanism
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorBarsRequest {
    pub data: Arc<Vec<Record>>,
    pub epsilon: f64,
    pub group_by: Option<ColumnName>,
    pub statistic: Statistic,
    pub column: ColumnName,
    pub num_simulations: u32,
}

/// Spread of the simulated draws for one group
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ErrorBar {
    pub mean: f64,
    pub std: f64,
    pub orig: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ErrorBarsResponse {
    pub error_bars: BTreeMap<String, ErrorBar>,
}
