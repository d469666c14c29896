//! Orchestrator library for differential-privacy exploration
//!
//! Keeps the dataset and query configuration of an analysis session, issues
//! point-estimate, confidence-interval and tradeoff-sweep requests to a
//! statistics service, and applies each result only while the configuration
//! it was computed for is still current.

pub mod core;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod settings;
pub mod traits;

// Re-export commonly used types
pub use core::{
    AnalysisState, AnalysisView, ConfigUpdate, Dataset, Epoch, EpsilonSet, PointEstimateResult, QueryConfiguration,
    RequestContext, TradeoffCurve, Versioned,
};
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{Orchestrator, ProcessedEvent, SessionCommand};
pub use settings::AnalysisSettings;
pub use traits::{DatasetCache, StatsService};
