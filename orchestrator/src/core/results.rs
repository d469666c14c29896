//! Derived result types: point estimate, confidence intervals, tradeoff curve

use std::collections::BTreeMap;

use serde::Serialize;
use shared::{ComputeStatsResponse, ErrorBar, ErrorBarsResponse};

use super::ranking::{RankShift, is_permutation_of, rank_shifts, rankings_differ};
use crate::error::{OrchestratorError, OrchestratorResult};

/// Two-sided 95% normal quantile used for confidence bands
pub const CONFIDENCE_Z: f64 = 1.96;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub name: String,
    pub original_value: f64,
    pub dp_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointEstimateResult {
    pub groups: Vec<GroupResult>,
    pub original_ranking: Vec<String>,
    pub dp_ranking: Vec<String>,
    pub ranking_changed: bool,
}

impl PointEstimateResult {
    /// Validate a service response and compare its rankings locally
    ///
    /// Both rankings must be permutations of the returned group names.
    pub fn from_response(response: ComputeStatsResponse) -> OrchestratorResult<Self> {
        let names: Vec<&str> = response.groups.iter().map(|g| g.name.as_str()).collect();
        for (label, ranking) in [("original", &response.original_ranking), ("dp", &response.dp_ranking)] {
            if !is_permutation_of(ranking, names.iter().copied()) {
                return Err(OrchestratorError::transport(
                    "compute-stats",
                    format!("{label} ranking is not a permutation of the returned groups"),
                ));
            }
        }

        let ranking_changed = rankings_differ(&response.original_ranking, &response.dp_ranking);
        let groups = response
            .groups
            .into_iter()
            .map(|g| GroupResult {
                name: g.name,
                original_value: g.original,
                dp_value: g.dp,
            })
            .collect();

        Ok(Self {
            groups,
            original_ranking: response.original_ranking,
            dp_ranking: response.dp_ranking,
            ranking_changed,
        })
    }

    pub fn rank_shifts(&self) -> Vec<RankShift> {
        rank_shifts(&self.original_ranking, &self.dp_ranking)
    }

    pub fn group(&self, name: &str) -> Option<&GroupResult> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Lower/upper bounds around a simulated mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBand {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceBand {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalEntry {
    pub mean: f64,
    pub std: f64,
    pub original: f64,
}

impl IntervalEntry {
    pub fn band(&self) -> ConfidenceBand {
        let half_width = CONFIDENCE_Z * self.std;
        ConfidenceBand {
            lower: self.mean - half_width,
            upper: self.mean + half_width,
        }
    }
}

impl From<ErrorBar> for IntervalEntry {
    fn from(bar: ErrorBar) -> Self {
        Self {
            mean: bar.mean,
            // Negative spreads are clamped to keep std >= 0
            std: bar.std.max(0.0),
            original: bar.orig,
        }
    }
}

/// Simulated spread of the DP mechanism per group
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConfidenceIntervalEstimate {
    pub groups: BTreeMap<String, IntervalEntry>,
}

impl ConfidenceIntervalEstimate {
    pub fn get(&self, name: &str) -> Option<&IntervalEntry> {
        self.groups.get(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Root-mean-square distance between simulated means and original values
    ///
    /// `None` when there are no groups to average over.
    pub fn rmse(&self) -> Option<f64> {
        if self.groups.is_empty() {
            return None;
        }
        let sum_of_squares: f64 = self
            .groups
            .values()
            .map(|entry| (entry.mean - entry.original).powi(2))
            .sum();
        Some((sum_of_squares / self.groups.len() as f64).sqrt())
    }
}

impl From<ErrorBarsResponse> for ConfidenceIntervalEstimate {
    fn from(response: ErrorBarsResponse) -> Self {
        Self {
            groups: response
                .error_bars
                .into_iter()
                .map(|(name, bar)| (name, IntervalEntry::from(bar)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeoffPoint {
    pub epsilon: f64,
    pub rmse: f64,
}

/// RMSE per epsilon, ascending by epsilon; failed epsilons are absent
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TradeoffCurve {
    pub points: Vec<TradeoffPoint>,
}

impl TradeoffCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn epsilons(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.epsilon).collect()
    }

    pub fn point_at(&self, epsilon: f64) -> Option<&TradeoffPoint> {
        self.points.iter().find(|p| p.epsilon == epsilon)
    }
}
