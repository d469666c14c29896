//! Wire contract of the external statistics service
//!
//! Messages are grouped by endpoint:
//! - `stats`: `POST compute-stats`, one noisy point estimate per group
//! - `error_bars`: `POST compute-error-bars`, repeated simulated draws per group
//! - `multi_epsilon`: `POST compute-multi-epsilon`, a value series swept over epsilons

pub mod stats;
pub mod error_bars;
pub mod multi_epsilon;

pub use stats::{ComputeStatsRequest, ComputeStatsResponse, GroupStat};

pub use error_bars::{ErrorBar, ErrorBarsRequest, ErrorBarsResponse};

pub use multi_epsilon::{EpsilonReport, ModelPerformance, MultiEpsilonRequest, MultiEpsilonResponse};
