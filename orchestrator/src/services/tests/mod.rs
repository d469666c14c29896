//! Service-specific tests
//!
//! Each service has its own test file with dedicated fixtures and helpers.


// Common test utilities for services
pub mod common {
    use std::sync::Arc;

    use shared::{Record, ScalarValue, Statistic};
    use shared::{ComputeStatsRequest, ErrorBarsRequest};

    /// Three regions, B well ahead of A and C
    pub fn sales_records() -> Arc<Vec<Record>> {
        let rows = [("A", 10.0), ("B", 20.0), ("B", 22.0), ("C", 5.0)];
        Arc::new(
            rows.iter()
                .map(|(region, sales)| {
                    Record::from([
                        ("region".to_string(), ScalarValue::Text(region.to_string())),
                        ("sales".to_string(), ScalarValue::Number(*sales)),
                    ])
                })
                .collect(),
        )
    }

    pub fn stats_request(epsilon: f64) -> ComputeStatsRequest {
        ComputeStatsRequest {
            data: sales_records(),
            epsilon,
            group_by: Some("region".to_string()),
            statistic: Statistic::Mean,
            column: "sales".to_string(),
        }
    }

    pub fn error_bars_request(epsilon: f64, num_simulations: u32) -> ErrorBarsRequest {
        ErrorBarsRequest {
            data: sales_records(),
            epsilon,
            group_by: Some("region".to_string()),
            statistic: Statistic::Mean,
            column: "sales".to_string(),
            num_simulations,
        }
    }
}
