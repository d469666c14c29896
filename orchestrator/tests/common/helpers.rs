//! Test helpers and builder patterns for orchestrator tests
//!
//! This module provides convenient helper functions and builder patterns
//! to reduce test boilerplate and improve maintainability.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use orchestrator::core::{ComputationKind, EventOutcome};
use orchestrator::traits::{MockDatasetCache, MockStatsService};
use orchestrator::{
    AnalysisSettings, ConfigUpdate, DatasetCache, Orchestrator, OrchestratorError, OrchestratorResult, ProcessedEvent,
    StatsService,
};
use shared::{
    ComputeStatsRequest, ComputeStatsResponse, ErrorBarsRequest, ErrorBarsResponse, MultiEpsilonRequest,
    MultiEpsilonResponse,
};

use super::fixtures::TestFixtures;

/// Type alias for test orchestrator with all mocks
pub type TestOrchestrator = Orchestrator<MockStatsService, MockDatasetCache>;

/// Builder pattern for creating test orchestrators with sensible defaults
pub struct OrchestratorBuilder {
    stats: MockStatsService,
    cache: Option<MockDatasetCache>,
    settings: AnalysisSettings,
}

impl OrchestratorBuilder {
    /// Create a new builder; the stats mock starts without expectations
    pub fn new() -> Self {
        Self {
            stats: MockStatsService::new(),
            cache: None,
            settings: AnalysisSettings::default(),
        }
    }

    /// Configure the stats service mock with a setup function
    pub fn with_stats<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockStatsService),
    {
        setup(&mut self.stats);
        self
    }

    /// Configure the dataset cache mock, replacing the permissive default
    pub fn with_cache<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockDatasetCache),
    {
        let mut cache = MockDatasetCache::new();
        setup(&mut cache);
        self.cache = Some(cache);
        self
    }

    pub fn with_settings<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut AnalysisSettings),
    {
        setup(&mut self.settings);
        self
    }

    /// Build the orchestrator with all configured mocks
    pub fn build(self) -> TestOrchestrator {
        let cache = self.cache.unwrap_or_else(TestHelpers::empty_cache);
        Orchestrator::new(self.stats, cache, self.settings)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Cache with nothing stored that accepts every write
    pub fn empty_cache() -> MockDatasetCache {
        let mut cache = MockDatasetCache::new();
        cache.expect_load().returning(|| Ok(None)).times(0..);
        cache.expect_store().returning(|_| Ok(())).times(0..);
        cache
    }

    /// Stats mock answering every request with the standard fixtures
    pub fn answer_everything(stats: &mut MockStatsService) {
        stats
            .expect_compute_stats()
            .returning(|_| Ok(TestFixtures::stable_stats_response()))
            .times(0..);
        stats
            .expect_compute_error_bars()
            .returning(|_| Ok(TestFixtures::error_bars_response()))
            .times(0..);
        stats
            .expect_compute_multi_epsilon()
            .returning(|request| Ok(TestFixtures::multi_epsilon_response(&request.epsilons)))
            .times(0..);
    }

    pub fn simple_orchestrator() -> TestOrchestrator {
        OrchestratorBuilder::new().with_stats(Self::answer_everything).build()
    }

    /// Load the sales dataset and select region/sales at the given epsilon
    pub async fn configure<S, C>(orchestrator: &mut Orchestrator<S, C>, epsilon: f64)
    where
        S: StatsService + 'static,
        C: DatasetCache + 'static,
    {
        orchestrator.load_dataset(TestFixtures::SALES_CSV).await.unwrap();
        orchestrator.update(ConfigUpdate::GroupBy(Some(TestFixtures::GROUP_BY.to_string())));
        orchestrator.update(ConfigUpdate::Measure(Some(TestFixtures::MEASURE.to_string())));
        orchestrator.update(ConfigUpdate::Epsilon(epsilon));
    }

    /// Process events until one of `kind` arrives, returning it
    pub async fn wait_for<S, C>(orchestrator: &mut Orchestrator<S, C>, kind: ComputationKind) -> ProcessedEvent
    where
        S: StatsService + 'static,
        C: DatasetCache + 'static,
    {
        loop {
            let event = orchestrator.process_next_event().await.expect("event channel open");
            if event.kind == kind {
                return event;
            }
        }
    }

    /// Process events until one of `kind` is applied
    pub async fn wait_for_applied<S, C>(orchestrator: &mut Orchestrator<S, C>, kind: ComputationKind) -> ProcessedEvent
    where
        S: StatsService + 'static,
        C: DatasetCache + 'static,
    {
        loop {
            let event = Self::wait_for(orchestrator, kind).await;
            if event.outcome == EventOutcome::Applied {
                return event;
            }
        }
    }

    /// Counter shared with a mock closure
    pub fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// A compute-stats call held open until the test completes it
pub struct PendingStats {
    pub request: ComputeStatsRequest,
    reply: oneshot::Sender<OrchestratorResult<ComputeStatsResponse>>,
}

impl PendingStats {
    pub fn complete(self, response: ComputeStatsResponse) {
        let _ = self.reply.send(Ok(response));
    }
}

/// Stats service whose point estimates resolve only when the test says so
///
/// Error-bar and multi-epsilon calls answer immediately with empty bodies.
#[derive(Clone, Default)]
pub struct GatedStatsService {
    pending: Arc<Mutex<Vec<PendingStats>>>,
}

impl GatedStatsService {
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn take_pending(&self) -> Vec<PendingStats> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }

    /// Yield to spawned tasks until `count` calls are held open
    pub async fn wait_for_pending(&self, count: usize) {
        while self.pending_count() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl StatsService for GatedStatsService {
    async fn compute_stats(&self, request: ComputeStatsRequest) -> OrchestratorResult<ComputeStatsResponse> {
        let (reply, response) = oneshot::channel();
        self.pending.lock().unwrap().push(PendingStats { request, reply });
        response
            .await
            .unwrap_or_else(|_| Err(OrchestratorError::transport("compute-stats", "gate dropped")))
    }

    async fn compute_error_bars(&self, _request: ErrorBarsRequest) -> OrchestratorResult<ErrorBarsResponse> {
        Ok(ErrorBarsResponse::default())
    }

    async fn compute_multi_epsilon(&self, _request: MultiEpsilonRequest) -> OrchestratorResult<MultiEpsilonResponse> {
        Ok(MultiEpsilonResponse::default())
    }
}
