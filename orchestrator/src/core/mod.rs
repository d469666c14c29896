//! Core business logic modules
//!
//! This module contains pure analysis logic with no I/O dependencies.
//! All functions are deterministic and easily testable.

pub mod config;
pub mod dataset;
pub mod epoch;
pub mod epsilon_set;
pub mod ranking;
pub mod results;
pub mod snapshot;
pub mod state;

pub use config::{ConfigUpdate, QueryConfiguration};
pub use dataset::{Dataset, DatasetStore, GroupRows, group_records};
pub use epoch::{Epoch, RequestContext, Versioned};
pub use epsilon_set::{EpsilonSet, SWEEP_EPSILONS};
pub use ranking::{RankShift, rank_descending, rankings_differ};
pub use results::{
    ConfidenceBand, ConfidenceIntervalEstimate, GroupResult, IntervalEntry, PointEstimateResult, TradeoffCurve,
    TradeoffPoint,
};
pub use snapshot::QuerySnapshot;
pub use state::{AnalysisState, AnalysisView, ComputationEvent, ComputationKind, EventOutcome};
