//! In-process Laplace backend
//!
//! Answers the same three requests as the HTTP service without leaving the
//! process. Noise is Laplace with scale `sensitivity / epsilon`:
//! - mean: value range of the measure column divided by the group size
//! - count: 1
//! - percent: 100 divided by the total row count

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    ComputeStatsRequest, ComputeStatsResponse, EpsilonReport, ErrorBar, ErrorBarsRequest, ErrorBarsResponse,
    GroupStat, MultiEpsilonRequest, MultiEpsilonResponse, Record, ScalarValue, Statistic,
};

use crate::core::{GroupRows, group_records, rank_descending, rankings_differ};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::StatsService;

/// Group label used when the request carries no grouping column
pub const UNGROUPED_LABEL: &str = "all";

/// Bins in the exploration histogram
pub const HISTOGRAM_BINS: usize = 5;

/// Exact statistic of one group and the sensitivity its noise is calibrated to
#[derive(Debug, Clone, PartialEq)]
struct GroupTruth {
    name: String,
    value: f64,
    sensitivity: f64,
}

pub struct LocalStatsService {
    rng: Mutex<StdRng>,
}

impl Default for LocalStatsService {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStatsService {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic noise stream, for reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw from Laplace(0, scale) by inverting the CDF
    fn sample_laplace(&self, scale: f64) -> OrchestratorResult<f64> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| OrchestratorError::transport("local", "noise source unavailable"))?;

        let unit: f64 = rng.r#gen();
        Ok(laplace_from_unit(unit, scale))
    }

    fn add_noise(&self, value: f64, sensitivity: f64, epsilon: f64) -> OrchestratorResult<f64> {
        if sensitivity == 0.0 {
            return Ok(value);
        }
        Ok(value + self.sample_laplace(sensitivity / epsilon)?)
    }
}

/// Inverse Laplace CDF at `unit` in [0, 1)
fn laplace_from_unit(unit: f64, scale: f64) -> f64 {
    let u = unit - 0.5;
    // 1 - 2|u| reaches zero at the bottom of the range
    let tail = (1.0 - 2.0 * u.abs()).max(f64::MIN_POSITIVE);
    -scale * u.signum() * tail.ln()
}

fn check_epsilon(operation: &str, epsilon: f64) -> OrchestratorResult<()> {
    if epsilon.is_finite() && epsilon > 0.0 {
        Ok(())
    } else {
        Err(OrchestratorError::transport(operation, format!("epsilon must be positive, got {epsilon}")))
    }
}

fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let min = values.iter().copied().reduce(f64::min)?;
    let max = values.iter().copied().reduce(f64::max)?;
    Some((min, max))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Exact per-group statistics, ordered by group name
fn group_truths(
    data: &[Record],
    group_by: Option<&str>,
    statistic: Statistic,
    column: &str,
) -> Vec<GroupTruth> {
    let groups = match group_by {
        Some(group_by) => group_records(data, group_by, column),
        None => {
            let mut whole = GroupRows::default();
            for record in data {
                whole.rows += 1;
                if let Some(value) = record.get(column).and_then(ScalarValue::as_f64) {
                    whole.values.push(value);
                }
            }
            BTreeMap::from([(UNGROUPED_LABEL.to_string(), whole)])
        }
    };

    let total_rows: usize = groups.values().map(|g| g.rows).sum();
    let all_values: Vec<f64> = groups.values().flat_map(|g| g.values.iter().copied()).collect();
    let range = value_range(&all_values).map(|(min, max)| max - min).unwrap_or(0.0);

    groups
        .into_iter()
        .filter_map(|(name, rows)| match statistic {
            Statistic::Mean => mean(&rows.values).map(|value| GroupTruth {
                name,
                value,
                sensitivity: range / rows.values.len() as f64,
            }),
            Statistic::Count => Some(GroupTruth {
                name,
                value: rows.rows as f64,
                sensitivity: 1.0,
            }),
            Statistic::Percent => (total_rows > 0).then(|| GroupTruth {
                name,
                value: rows.rows as f64 * 100.0 / total_rows as f64,
                sensitivity: 100.0 / total_rows as f64,
            }),
        })
        .collect()
}

/// Equal-width histogram over the value range, labelled "lo-hi"
fn histogram_bins(values: &[f64]) -> Vec<(String, i64)> {
    let Some((min, max)) = value_range(values) else {
        return Vec::new();
    };
    let width = (max - min) / HISTOGRAM_BINS as f64;
    let mut counts = [0i64; HISTOGRAM_BINS];
    for value in values {
        let index = if width > 0.0 {
            (((value - min) / width) as usize).min(HISTOGRAM_BINS - 1)
        } else {
            0
        };
        counts[index] += 1;
    }

    counts
        .iter()
        .enumerate()
        .map(|(index, count)| {
            let lo = min + width * index as f64;
            let hi = lo + width;
            (format!("{lo:.2}-{hi:.2}"), *count)
        })
        .collect()
}

#[async_trait]
impl StatsService for LocalStatsService {
    async fn compute_stats(&self, request: ComputeStatsRequest) -> OrchestratorResult<ComputeStatsResponse> {
        check_epsilon("compute-stats", request.epsilon)?;
        let truths = group_truths(&request.data, request.group_by.as_deref(), request.statistic, &request.column);

        let mut groups = Vec::with_capacity(truths.len());
        for truth in truths {
            let dp = self.add_noise(truth.value, truth.sensitivity, request.epsilon)?;
            groups.push(GroupStat {
                name: truth.name,
                original: truth.value,
                dp,
            });
        }

        let original_ranking = rank_descending(groups.iter().map(|g| (g.name.as_str(), g.original)));
        let dp_ranking = rank_descending(groups.iter().map(|g| (g.name.as_str(), g.dp)));
        let ranking_changed = rankings_differ(&original_ranking, &dp_ranking);

        Ok(ComputeStatsResponse {
            groups,
            original_ranking,
            dp_ranking,
            ranking_changed,
        })
    }

    async fn compute_error_bars(&self, request: ErrorBarsRequest) -> OrchestratorResult<ErrorBarsResponse> {
        check_epsilon("compute-error-bars", request.epsilon)?;
        let truths = group_truths(&request.data, request.group_by.as_deref(), request.statistic, &request.column);
        let draws = request.num_simulations.max(1) as usize;

        let mut error_bars = BTreeMap::new();
        for truth in truths {
            let mut samples = Vec::with_capacity(draws);
            for _ in 0..draws {
                samples.push(self.add_noise(truth.value, truth.sensitivity, request.epsilon)?);
            }
            let sample_mean = samples.iter().sum::<f64>() / draws as f64;
            let variance = samples.iter().map(|s| (s - sample_mean).powi(2)).sum::<f64>() / draws as f64;
            error_bars.insert(
                truth.name,
                ErrorBar {
                    mean: sample_mean,
                    std: variance.sqrt(),
                    orig: truth.value,
                },
            );
        }

        Ok(ErrorBarsResponse { error_bars })
    }

    async fn compute_multi_epsilon(&self, request: MultiEpsilonRequest) -> OrchestratorResult<MultiEpsilonResponse> {
        let values = request.values;
        let n = values.len();
        let range = value_range(&values).map(|(min, max)| max - min).unwrap_or(0.0);
        let bins = histogram_bins(&values);

        let mut results = Vec::with_capacity(request.epsilons.len());
        for epsilon in request.epsilons {
            let mut report = EpsilonReport {
                epsilon,
                mean: None,
                count: None,
                histogram: BTreeMap::new(),
                dp_error: None,
                model_performance: None,
            };

            if let Err(error) = check_epsilon("compute-multi-epsilon", epsilon) {
                report.dp_error = Some(error.to_string());
                results.push(report);
                continue;
            }
            let Some(true_mean) = mean(&values) else {
                report.dp_error = Some("no numeric values".to_string());
                results.push(report);
                continue;
            };

            report.mean = Some(self.add_noise(true_mean, range / n as f64, epsilon)?);
            report.count = Some(self.add_noise(n as f64, 1.0, epsilon)?.round().max(0.0) as i64);
            for (label, count) in &bins {
                let noisy = self.add_noise(*count as f64, 1.0, epsilon)?.round().max(0.0) as i64;
                report.histogram.insert(label.clone(), noisy);
            }
            results.push(report);
        }

        Ok(MultiEpsilonResponse { results })
    }
}
