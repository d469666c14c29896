//! Trait definitions with mockall annotations for testing
//!
//! The orchestrator talks to the outside world through these seams only:
//! the statistics service that adds the noise, and the store that keeps the
//! last uploaded dataset text across restarts.

use shared::{
    ComputeStatsRequest, ComputeStatsResponse, ErrorBarsRequest, ErrorBarsResponse, MultiEpsilonRequest,
    MultiEpsilonResponse,
};

use crate::error::OrchestratorResult;

/// Statistics service abstraction for dependency injection
///
/// Any failure (transport, non-2xx status, undecodable body) is reported as
/// `OrchestratorError::TransportFailure`; callers never distinguish between them.
#[mockall::automock]
#[async_trait::async_trait]
pub trait StatsService: Send + Sync {
    /// One noisy estimate per group with rankings (`POST compute-stats`)
    async fn compute_stats(&self, request: ComputeStatsRequest) -> OrchestratorResult<ComputeStatsResponse>;

    /// Repeated simulated draws per group (`POST compute-error-bars`)
    async fn compute_error_bars(&self, request: ErrorBarsRequest) -> OrchestratorResult<ErrorBarsResponse>;

    /// A value series evaluated at several epsilons (`POST compute-multi-epsilon`)
    async fn compute_multi_epsilon(&self, request: MultiEpsilonRequest) -> OrchestratorResult<MultiEpsilonResponse>;
}

/// Persistence for the raw text of the last successfully loaded dataset
#[mockall::automock]
#[async_trait::async_trait]
pub trait DatasetCache: Send + Sync {
    /// Previously cached raw text, if any
    async fn load(&self) -> OrchestratorResult<Option<String>>;

    /// Overwrite the cached raw text
    async fn store(&self, raw_text: &str) -> OrchestratorResult<()>;
}
