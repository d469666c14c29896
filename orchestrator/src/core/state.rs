//! Core analysis state management
//!
//! Single owner of the dataset, the query configuration, the configuration
//! epoch and the three derived result caches. Every mutation of the dataset or
//! configuration advances the epoch; computation events are applied only when
//! they carry the current epoch.

use std::sync::Arc;

use serde::Serialize;
use shared::{ColumnName, epoch_debug, epoch_error, epoch_info, epoch_warn};

use super::config::{ConfigUpdate, QueryConfiguration};
use super::dataset::{Dataset, DatasetStore};
use super::epoch::{Epoch, RequestContext, Versioned};
use super::epsilon_set::EpsilonSet;
use super::results::{ConfidenceIntervalEstimate, PointEstimateResult, TradeoffCurve};
use super::snapshot::QuerySnapshot;
use crate::error::{OrchestratorError, OrchestratorResult};

/// The three request families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComputationKind {
    PointEstimate,
    ConfidenceInterval,
    TradeoffSweep,
}

/// Completion of an issued request, sent back to the owning state
#[derive(Debug)]
pub enum ComputationEvent {
    PointEstimate {
        context: RequestContext,
        outcome: OrchestratorResult<PointEstimateResult>,
    },
    ConfidenceInterval {
        context: RequestContext,
        outcome: OrchestratorResult<ConfidenceIntervalEstimate>,
    },
    TradeoffSweep {
        context: RequestContext,
        curve: TradeoffCurve,
    },
}

impl ComputationEvent {
    pub fn kind(&self) -> ComputationKind {
        match self {
            ComputationEvent::PointEstimate { .. } => ComputationKind::PointEstimate,
            ComputationEvent::ConfidenceInterval { .. } => ComputationKind::ConfidenceInterval,
            ComputationEvent::TradeoffSweep { .. } => ComputationKind::TradeoffSweep,
        }
    }

    pub fn context(&self) -> &RequestContext {
        match self {
            ComputationEvent::PointEstimate { context, .. }
            | ComputationEvent::ConfidenceInterval { context, .. }
            | ComputationEvent::TradeoffSweep { context, .. } => context,
        }
    }
}

/// What applying an event did to the state
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// Result stored
    Applied,
    /// Event carried an older epoch and was ignored
    Discarded,
    /// Current-epoch failure; cached result left as it was
    Failed(Arc<OrchestratorError>),
}

impl EventOutcome {
    pub fn error(&self) -> Option<&OrchestratorError> {
        match self {
            EventOutcome::Failed(error) => Some(&**error),
            _ => None,
        }
    }
}

// Failures compare by their rendered message
impl PartialEq for EventOutcome {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EventOutcome::Applied, EventOutcome::Applied) => true,
            (EventOutcome::Discarded, EventOutcome::Discarded) => true,
            (EventOutcome::Failed(a), EventOutcome::Failed(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Everything downstream consumers need to render, including staleness
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub epoch: Epoch,
    pub computable: bool,
    pub blocking_reason: Option<String>,
    pub columns: Vec<ColumnName>,
    pub row_count: usize,
    pub configuration: QueryConfiguration,
    pub point_estimate: Option<Versioned<PointEstimateResult>>,
    pub point_estimate_error: Option<Versioned<String>>,
    pub confidence_intervals: Option<Versioned<ConfidenceIntervalEstimate>>,
    pub tradeoff_curve: Option<Versioned<TradeoffCurve>>,
}

impl AnalysisView {
    pub fn point_estimate_is_fresh(&self) -> bool {
        self.point_estimate.as_ref().is_some_and(|v| v.is_fresh(self.epoch))
    }

    pub fn confidence_intervals_are_fresh(&self) -> bool {
        self.confidence_intervals.as_ref().is_some_and(|v| v.is_fresh(self.epoch))
    }

    pub fn tradeoff_curve_is_fresh(&self) -> bool {
        self.tradeoff_curve.as_ref().is_some_and(|v| v.is_fresh(self.epoch))
    }
}

/// Core analysis state
#[derive(Debug, Default)]
pub struct AnalysisState {
    dataset: DatasetStore,
    configuration: QueryConfiguration,
    exploration_epsilons: EpsilonSet,
    epoch: Epoch,

    // Derived caches, each written by exactly one computation family
    point_estimate: Option<Versioned<PointEstimateResult>>,
    point_estimate_error: Option<Versioned<String>>,
    confidence_intervals: Option<Versioned<ConfidenceIntervalEstimate>>,
    tradeoff_curve: Option<Versioned<TradeoffCurve>>,
}

impl AnalysisState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dataset from raw text
    ///
    /// On success the column selections reset, caches are dropped and the epoch advances.
    /// On failure nothing changes.
    pub fn load_dataset(&mut self, raw_text: &str) -> OrchestratorResult<Epoch> {
        let (columns, rows) = {
            let dataset = self.dataset.load(raw_text)?;
            (dataset.columns().len(), dataset.len())
        };
        self.configuration.on_dataset_replaced();
        self.point_estimate = None;
        self.point_estimate_error = None;
        self.confidence_intervals = None;
        self.tradeoff_curve = None;

        let epoch = self.epoch.advance();
        epoch_info!(epoch, "📂 Dataset loaded: {} rows, {} columns", rows, columns);
        Ok(epoch)
    }

    /// Store a configuration field; the epoch advances only if the value changed
    pub fn update(&mut self, update: ConfigUpdate) -> Option<Epoch> {
        if !self.configuration.set(update) {
            return None;
        }
        let epoch = self.epoch.advance();
        epoch_debug!(epoch, "⚙️ Configuration changed: {:?}", self.configuration);
        Some(epoch)
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.current()
    }

    pub fn configuration(&self) -> &QueryConfiguration {
        &self.configuration
    }

    pub fn exploration_epsilons(&self) -> &EpsilonSet {
        &self.exploration_epsilons
    }

    pub fn exploration_epsilons_mut(&mut self) -> &mut EpsilonSet {
        &mut self.exploration_epsilons
    }

    pub fn is_computable(&self) -> bool {
        self.configuration.is_computable(self.dataset())
    }

    /// Capture the current query for issuing requests
    pub fn snapshot(&self) -> OrchestratorResult<QuerySnapshot> {
        if let Some(reason) = self.configuration.blocking_reason(self.dataset()) {
            return Err(OrchestratorError::invalid_config(reason));
        }
        // Both present once blocking_reason is None
        let (Some(dataset), Some(group_by), Some(column)) = (
            self.dataset(),
            self.configuration.group_by.clone(),
            self.configuration.measure.clone(),
        ) else {
            return Err(OrchestratorError::invalid_config("incomplete configuration"));
        };

        Ok(QuerySnapshot {
            data: dataset.query_records(&group_by, &column),
            group_by,
            statistic: self.configuration.statistic,
            column,
            epsilon: self.configuration.epsilon,
        })
    }

    /// Apply a completed computation if it belongs to the current epoch
    pub fn apply(&mut self, event: ComputationEvent) -> EventOutcome {
        let context = *event.context();
        if !context.is_current(self.epoch) {
            epoch_debug!(
                context.epoch,
                "🗑️ Discarding stale {:?} result {} (current epoch {})",
                event.kind(),
                context.request_id,
                self.epoch
            );
            return EventOutcome::Discarded;
        }

        match event {
            ComputationEvent::PointEstimate { outcome: Ok(result), .. } => {
                epoch_info!(
                    context.epoch,
                    "📊 Point estimate for {} groups (ranking changed: {})",
                    result.groups.len(),
                    result.ranking_changed
                );
                self.point_estimate = Some(Versioned::new(result, context.epoch));
                self.point_estimate_error = None;
                EventOutcome::Applied
            }
            ComputationEvent::PointEstimate { outcome: Err(error), .. } => {
                epoch_error!(context.epoch, "❌ Point estimate {} failed: {}", context.request_id, error);
                self.point_estimate_error = Some(Versioned::new(error.to_string(), context.epoch));
                EventOutcome::Failed(Arc::new(error))
            }
            ComputationEvent::ConfidenceInterval { outcome: Ok(estimate), .. } => {
                epoch_debug!(context.epoch, "📈 Confidence intervals refreshed for {} groups", estimate.len());
                self.confidence_intervals = Some(Versioned::new(estimate, context.epoch));
                EventOutcome::Applied
            }
            ComputationEvent::ConfidenceInterval { outcome: Err(error), .. } => {
                epoch_warn!(
                    context.epoch,
                    "⚠️ Confidence interval poll failed: {}. Keeping previous estimate.",
                    error
                );
                EventOutcome::Failed(Arc::new(error))
            }
            ComputationEvent::TradeoffSweep { curve, .. } => {
                epoch_info!(context.epoch, "📉 Tradeoff curve completed with {} points", curve.len());
                self.tradeoff_curve = Some(Versioned::new(curve, context.epoch));
                EventOutcome::Applied
            }
        }
    }

    pub fn point_estimate(&self) -> Option<&Versioned<PointEstimateResult>> {
        self.point_estimate.as_ref()
    }

    pub fn confidence_intervals(&self) -> Option<&Versioned<ConfidenceIntervalEstimate>> {
        self.confidence_intervals.as_ref()
    }

    pub fn tradeoff_curve(&self) -> Option<&Versioned<TradeoffCurve>> {
        self.tradeoff_curve.as_ref()
    }

    pub fn view(&self) -> AnalysisView {
        let dataset = self.dataset();
        AnalysisView {
            epoch: self.epoch,
            computable: self.is_computable(),
            blocking_reason: self.configuration.blocking_reason(dataset),
            columns: dataset.map(|d| d.columns().to_vec()).unwrap_or_default(),
            row_count: dataset.map(Dataset::len).unwrap_or(0),
            configuration: self.configuration.clone(),
            point_estimate: self.point_estimate.clone(),
            point_estimate_error: self.point_estimate_error.clone(),
            confidence_intervals: self.confidence_intervals.clone(),
            tradeoff_curve: self.tradeoff_curve.clone(),
        }
    }
}
