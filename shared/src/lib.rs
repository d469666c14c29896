//! Shared types for the differential-privacy explorer
//!
//! Contains the dataset value types and the wire contract spoken with the
//! external statistics service. Orchestrator-internal state (epochs, result
//! caches, configuration) lives in the orchestrator crate.

pub mod types;
pub mod errors;
pub mod logging;
pub mod messages;

pub use types::*;
pub use errors::*;

// Re-export the statistics service wire contract
pub use messages::{
    // compute-stats
    ComputeStatsRequest, ComputeStatsResponse, GroupStat,

    // compute-error-bars
    ErrorBar, ErrorBarsRequest, ErrorBarsResponse,

    // compute-multi-epsilon
    EpsilonReport, ModelPerformance, MultiEpsilonRequest, MultiEpsilonResponse,
};
