//! Test fixtures and data for orchestrator tests
//!
//! This module provides consistent test data and fixtures used across all test suites.

use std::collections::BTreeMap;

use shared::{ComputeStatsResponse, EpsilonReport, ErrorBar, ErrorBarsResponse, GroupStat, MultiEpsilonResponse};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Sales per region: B leads, A second, C last
    pub const SALES_CSV: &'static str = "region,sales\nA,10\nA,11\nB,20\nB,22\nC,5\n";

    /// Unrelated dataset used to exercise replacement
    pub const CITY_CSV: &'static str = "city,price,rooms\nOslo,300,2\nRome,180,3\n";

    pub const GROUP_BY: &'static str = "region";
    pub const MEASURE: &'static str = "sales";

    /// Configured epsilon outside the sweep set, so poll requests can be told apart
    pub const POLL_EPSILON: f64 = 0.7;

    pub const SWEEP_EPSILONS: [f64; 6] = [0.1, 0.25, 0.5, 1.0, 2.0, 5.0];

    /// Exact group means of `SALES_CSV`
    pub fn original_means() -> Vec<(&'static str, f64)> {
        vec![("A", 10.5), ("B", 21.0), ("C", 5.0)]
    }

    /// Point estimate whose DP ranking matches the original one
    pub fn stable_stats_response() -> ComputeStatsResponse {
        Self::stats_response(&[("A", 10.2), ("B", 21.3), ("C", 4.8)], &["B", "A", "C"])
    }

    /// Point estimate where noise swaps A and C
    pub fn reordered_stats_response() -> ComputeStatsResponse {
        Self::stats_response(&[("A", 3.9), ("B", 20.4), ("C", 6.1)], &["B", "C", "A"])
    }

    pub fn stats_response(dp: &[(&str, f64)], dp_ranking: &[&str]) -> ComputeStatsResponse {
        let originals: BTreeMap<&str, f64> = Self::original_means().into_iter().collect();
        ComputeStatsResponse {
            groups: dp
                .iter()
                .map(|(name, value)| GroupStat {
                    name: name.to_string(),
                    original: originals[name],
                    dp: *value,
                })
                .collect(),
            original_ranking: vec!["B".to_string(), "A".to_string(), "C".to_string()],
            dp_ranking: dp_ranking.iter().map(|name| name.to_string()).collect(),
            ranking_changed: false,
        }
    }

    /// Error bars whose simulated means sit `offset` above every original value
    ///
    /// The RMSE of such a response is exactly `offset`.
    pub fn error_bars_with_offset(offset: f64) -> ErrorBarsResponse {
        ErrorBarsResponse {
            error_bars: Self::original_means()
                .into_iter()
                .map(|(name, orig)| {
                    (
                        name.to_string(),
                        ErrorBar {
                            mean: orig + offset,
                            std: 0.5,
                            orig,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn error_bars_response() -> ErrorBarsResponse {
        Self::error_bars_with_offset(0.2)
    }

    pub fn multi_epsilon_response(epsilons: &[f64]) -> MultiEpsilonResponse {
        MultiEpsilonResponse {
            results: epsilons
                .iter()
                .map(|epsilon| EpsilonReport {
                    epsilon: *epsilon,
                    mean: Some(13.6),
                    count: Some(5),
                    histogram: BTreeMap::from([("5.00-8.40".to_string(), 1)]),
                    dp_error: None,
                    model_performance: None,
                })
                .collect(),
        }
    }
}
