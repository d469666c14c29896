//! Read-only query snapshot captured when a request is issued
//!
//! Computations never read live session state; they work from the snapshot
//! taken at issue time, so later edits cannot leak into an in-flight request.

use std::sync::Arc;

use shared::{ColumnName, ComputeStatsRequest, ErrorBarsRequest, Record, Statistic};

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub data: Arc<Vec<Record>>,
    pub group_by: ColumnName,
    pub statistic: Statistic,
    pub column: ColumnName,
    pub epsilon: f64,
}

impl QuerySnapshot {
    pub fn stats_request(&self) -> ComputeStatsRequest {
        ComputeStatsRequest {
            data: Arc::clone(&self.data),
            epsilon: self.epsilon,
            group_by: Some(self.group_by.clone()),
            statistic: self.statistic,
            column: self.column.clone(),
        }
    }

    pub fn error_bars_request(&self, num_simulations: u32) -> ErrorBarsRequest {
        self.error_bars_request_at(self.epsilon, num_simulations)
    }

    /// Same query shape with a substituted epsilon
    pub fn error_bars_request_at(&self, epsilon: f64, num_simulations: u32) -> ErrorBarsRequest {
        ErrorBarsRequest {
            data: Arc::clone(&self.data),
            epsilon,
            group_by: Some(self.group_by.clone()),
            statistic: self.statistic,
            column: self.column.clone(),
            num_simulations,
        }
    }
}
