//! `compute-stats` request and response bodies

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::{ColumnName, Record, Statistic};

/// Request for a single noisy estimate per group
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ComputeStatsRequest {
    pub data: Arc<Vec<Record>>,
    pub epsilon: f64,
    pub group_by: Option<ColumnName>,
    pub statistic: Statistic,
    pub column: ColumnName,
}

/// True and noisy value of one group
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GroupStat {
    pub name: String,
    pub original: f64,
    pub dp: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ComputeStatsResponse {
    pub groups: Vec<GroupStat>,
    pub original_ranking: Vec<String>,
    pub dp_ranking: Vec<String>,
    #[serde(default)]
    pub ranking_changed: bool,
}
