//! Main orchestrator implementation
//!
//! Owns the analysis state and drives the three request families against the
//! injected statistics service:
//! - point estimate: single shot, issued on request
//! - confidence-interval poll: fixed cadence, restarted on every epoch change
//! - tradeoff sweep: sequential over the sweep epsilons, restarted on every epoch change
//!
//! Spawned tasks never touch the state. They report back over an event
//! channel and the orchestrator applies each event only if its epoch is current.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

use shared::{EpsilonReport, MultiEpsilonRequest, epoch_debug, epoch_info, epoch_warn, logging};

use crate::core::{
    AnalysisState, AnalysisView, ComputationEvent, ComputationKind, ConfidenceIntervalEstimate, ConfigUpdate, Epoch,
    EventOutcome, PointEstimateResult, QuerySnapshot, RequestContext, TradeoffCurve, TradeoffPoint,
};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::settings::AnalysisSettings;
use crate::traits::{DatasetCache, StatsService};

/// Capacity of the session command channel
const COMMAND_BUFFER: usize = 32;

const POINT_ESTIMATE: &str = "point estimate";

/// Commands accepted by [`Orchestrator::run`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    LoadDataset(String),
    Update(ConfigUpdate),
    AddExplorationEpsilon(f64),
    RequestPointEstimate,
    Shutdown,
}

/// An event taken off the channel and what applying it did
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedEvent {
    pub kind: ComputationKind,
    pub context: RequestContext,
    pub outcome: EventOutcome,
}

/// Orchestrator that coordinates the analysis session
pub struct Orchestrator<S, C>
where
    S: StatsService + 'static,
    C: DatasetCache + 'static,
{
    /// Core state management
    state: AnalysisState,

    /// Injected services
    stats: Arc<S>,
    cache: C,
    settings: AnalysisSettings,

    /// Completed computations flowing back from spawned tasks
    events_tx: mpsc::UnboundedSender<ComputationEvent>,
    events_rx: mpsc::UnboundedReceiver<ComputationEvent>,

    /// Latest view for subscribers
    view_tx: watch::Sender<AnalysisView>,

    /// Background work of the current epoch
    poll_task: Option<JoinHandle<()>>,
    sweep_task: Option<JoinHandle<()>>,
    point_tasks: Vec<JoinHandle<()>>,

    /// Cache restore happens at most once per process
    restored: bool,

    command_tx: mpsc::Sender<SessionCommand>,
    command_rx: mpsc::Receiver<SessionCommand>,
}

impl<S, C> Orchestrator<S, C>
where
    S: StatsService + 'static,
    C: DatasetCache + 'static,
{
    /// Create new orchestrator with injected dependencies
    ///
    /// Completed computations queue up until [`Orchestrator::run`] or
    /// [`Orchestrator::process_next_event`] drains them. A session that stays
    /// computable without being pumped gains one poll event per period.
    pub fn new(stats: S, cache: C, settings: AnalysisSettings) -> Self {
        let state = AnalysisState::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(state.view());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        Self {
            state,
            stats: Arc::new(stats),
            cache,
            settings,
            events_tx,
            events_rx,
            view_tx,
            poll_task: None,
            sweep_task: None,
            point_tasks: Vec::new(),
            restored: false,
            command_tx,
            command_rx,
        }
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn view(&self) -> AnalysisView {
        self.state.view()
    }

    /// Receiver that sees a fresh view after every state change
    pub fn subscribe(&self) -> watch::Receiver<AnalysisView> {
        self.view_tx.subscribe()
    }

    /// Sender for driving a running [`Orchestrator::run`] loop
    pub fn command_sender(&self) -> mpsc::Sender<SessionCommand> {
        self.command_tx.clone()
    }

    /// Whether the confidence-interval poll is currently running
    pub fn poll_active(&self) -> bool {
        self.poll_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Whether a tradeoff sweep is currently running
    pub fn sweep_active(&self) -> bool {
        self.sweep_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.state.view());
    }

    /// Load the cached dataset text, once per process
    ///
    /// Returns whether a dataset was restored. The cache is not rewritten and
    /// the usual column reset applies, so nothing is computed until the
    /// analyst selects columns again.
    pub async fn restore_from_cache(&mut self) -> OrchestratorResult<bool> {
        if self.restored {
            return Ok(false);
        }
        self.restored = true;

        let Some(raw_text) = self.cache.load().await? else {
            tracing::debug!("No cached dataset to restore");
            return Ok(false);
        };

        match self.state.load_dataset(&raw_text) {
            Ok(epoch) => {
                epoch_info!(epoch, "♻️ Restored cached dataset");
                self.on_configuration_changed();
                Ok(true)
            }
            Err(e) => {
                logging::log_error("Cached dataset is unusable", &e);
                Ok(false)
            }
        }
    }

    /// Replace the dataset and cache its raw text
    ///
    /// A cache write failure is logged; the load itself still succeeds.
    pub async fn load_dataset(&mut self, raw_text: &str) -> OrchestratorResult<Epoch> {
        let epoch = self.state.load_dataset(raw_text)?;
        // Counts as restored: a later restore must not clobber this upload
        self.restored = true;

        if let Err(e) = self.cache.store(raw_text).await {
            epoch_warn!(epoch, "⚠️ Could not cache dataset text: {}", e);
        }

        self.on_configuration_changed();
        Ok(epoch)
    }

    /// Apply one configuration edit; returns the new epoch if anything changed
    pub fn update(&mut self, update: ConfigUpdate) -> Option<Epoch> {
        let epoch = self.state.update(update)?;
        self.on_configuration_changed();
        Some(epoch)
    }

    /// Add an epsilon to the exploration list; false if it was invalid or already present
    pub fn add_exploration_epsilon(&mut self, epsilon: f64) -> bool {
        self.state.exploration_epsilons_mut().add(epsilon)
    }

    /// Stop work tied to the old epoch and restart it for the new one
    fn on_configuration_changed(&mut self) {
        self.stop_background_tasks();

        let epoch = self.state.epoch();
        match self.state.snapshot() {
            Ok(snapshot) => {
                self.start_poll(epoch, snapshot.clone());
                self.start_sweep(epoch, snapshot);
            }
            Err(e) => {
                epoch_debug!(epoch, "⏸️ Background computations idle: {}", e);
            }
        }

        self.publish();
    }

    fn stop_background_tasks(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        if let Some(task) = self.sweep_task.take() {
            task.abort();
        }
    }

    fn start_poll(&mut self, epoch: Epoch, snapshot: QuerySnapshot) {
        let stats = Arc::clone(&self.stats);
        let events = self.events_tx.clone();
        let period = self.settings.poll_interval;
        let num_simulations = self.settings.num_simulations;

        epoch_debug!(epoch, "⏱️ Starting confidence interval poll every {:?}", period);
        self.poll_task = Some(tokio::spawn(async move {
            run_confidence_poll(stats, events, epoch, snapshot, period, num_simulations).await;
        }));
    }

    fn start_sweep(&mut self, epoch: Epoch, snapshot: QuerySnapshot) {
        let stats = Arc::clone(&self.stats);
        let events = self.events_tx.clone();
        let epsilons = self.settings.sweep_epsilons.clone();
        let num_simulations = self.settings.num_simulations;

        let context = RequestContext::new(epoch);
        epoch_debug!(epoch, "📉 Starting tradeoff sweep {} over {:?}", context.request_id, epsilons);
        self.sweep_task = Some(tokio::spawn(async move {
            let curve = run_tradeoff_sweep(&*stats, context, &snapshot, &epsilons, num_simulations).await;
            let _ = events.send(ComputationEvent::TradeoffSweep { context, curve });
        }));
    }

    /// Issue a point estimate for the current configuration
    ///
    /// The result arrives later as an event; the returned context identifies it.
    pub fn request_point_estimate(&mut self) -> OrchestratorResult<RequestContext> {
        let snapshot = self.state.snapshot()?;
        let context = RequestContext::new(self.state.epoch());
        let stats = Arc::clone(&self.stats);
        let events = self.events_tx.clone();

        epoch_info!(context.epoch, "📤 Requesting point estimate {}", context.request_id);
        let task = tokio::spawn(async move {
            let outcome = stats
                .compute_stats(snapshot.stats_request())
                .await
                .and_then(PointEstimateResult::from_response);
            let _ = events.send(ComputationEvent::PointEstimate { context, outcome });
        });

        self.point_tasks.retain(|task| !task.is_finished());
        self.point_tasks.push(task);
        Ok(context)
    }

    /// Process events until the point estimate issued under `context` arrives
    pub async fn await_point_estimate(&mut self, context: RequestContext) -> OrchestratorResult<PointEstimateResult> {
        loop {
            let processed = self
                .process_next_event()
                .await
                .ok_or_else(|| OrchestratorError::invalid_config("event channel closed"))?;

            if processed.kind != ComputationKind::PointEstimate || processed.context.request_id != context.request_id {
                continue;
            }

            return match processed.outcome {
                EventOutcome::Applied => self
                    .state
                    .point_estimate()
                    .map(|versioned| versioned.value.clone())
                    .ok_or_else(|| OrchestratorError::invalid_config("point estimate missing after apply")),
                EventOutcome::Failed(error) => Err(Arc::try_unwrap(error)
                    .unwrap_or_else(|error| OrchestratorError::computation_failed(POINT_ESTIMATE, error.to_string()))),
                EventOutcome::Discarded => Err(OrchestratorError::superseded(POINT_ESTIMATE)),
            };
        }
    }

    /// Request a point estimate and wait for it
    pub async fn compute_point_estimate(&mut self) -> OrchestratorResult<PointEstimateResult> {
        let context = self.request_point_estimate()?;
        self.await_point_estimate(context).await
    }

    /// Wait for the next completed computation and apply it
    pub async fn process_next_event(&mut self) -> Option<ProcessedEvent> {
        let event = self.events_rx.recv().await?;
        Some(self.handle_event(event))
    }

    fn handle_event(&mut self, event: ComputationEvent) -> ProcessedEvent {
        let kind = event.kind();
        let context = *event.context();
        let outcome = self.state.apply(event);
        if outcome != EventOutcome::Discarded {
            self.publish();
        }
        ProcessedEvent { kind, context, outcome }
    }

    /// Evaluate the measure column at every exploration epsilon
    pub async fn explore_epsilons(&self) -> OrchestratorResult<Vec<EpsilonReport>> {
        let dataset = self
            .state
            .dataset()
            .ok_or_else(|| OrchestratorError::invalid_config("no dataset loaded"))?;
        let measure = self
            .state
            .configuration()
            .measure
            .as_deref()
            .ok_or_else(|| OrchestratorError::invalid_config("no measure column selected"))?;

        let values = dataset.numeric_values(measure);
        if values.is_empty() {
            return Err(OrchestratorError::invalid_config(format!(
                "measure column '{measure}' has no numeric values"
            )));
        }

        let epsilons = self.state.exploration_epsilons().values().to_vec();
        let epoch = self.state.epoch();
        epoch_info!(
            epoch,
            "🔭 Exploring {} epsilons over {} values of '{}'",
            epsilons.len(),
            values.len(),
            measure
        );

        let response = self
            .stats
            .compute_multi_epsilon(MultiEpsilonRequest { values, epsilons })
            .await?;

        for report in response.results.iter().filter(|r| !r.succeeded()) {
            epoch_warn!(
                epoch,
                "⚠️ Exploration at ε={} failed: {}",
                report.epsilon,
                report.dp_error.as_deref().unwrap_or("no statistics returned")
            );
        }
        Ok(response.results)
    }

    /// Main loop: apply commands and computation events until shutdown
    pub async fn run(&mut self) -> OrchestratorResult<()> {
        logging::log_startup("analysis session");

        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    if !self.handle_command(command).await {
                        break;
                    }
                },

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                },
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Returns false once the session should stop
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::LoadDataset(raw_text) => {
                if let Err(e) = self.load_dataset(&raw_text).await {
                    logging::log_error("Dataset rejected", &e);
                }
            }
            SessionCommand::Update(update) => {
                self.update(update);
            }
            SessionCommand::AddExplorationEpsilon(epsilon) => {
                if !self.add_exploration_epsilon(epsilon) {
                    tracing::debug!("Exploration epsilon {} ignored", epsilon);
                }
            }
            SessionCommand::RequestPointEstimate => {
                if let Err(e) = self.request_point_estimate() {
                    logging::log_error("Point estimate not issued", &e);
                }
            }
            SessionCommand::Shutdown => return false,
        }
        true
    }

    /// Stop every background task; results still in flight are dropped
    pub fn shutdown(&mut self) {
        self.stop_background_tasks();
        for task in self.point_tasks.drain(..) {
            task.abort();
        }
        logging::log_shutdown("analysis session ended");
    }
}

impl<S, C> Drop for Orchestrator<S, C>
where
    S: StatsService + 'static,
    C: DatasetCache + 'static,
{
    fn drop(&mut self) {
        self.stop_background_tasks();
        for task in self.point_tasks.drain(..) {
            task.abort();
        }
    }
}

/// Issue one error-bar request per tick until aborted
///
/// The first tick fires immediately. A slow request delays the next tick
/// instead of overlapping it; a failed request is reported and the poll goes on.
async fn run_confidence_poll<S>(
    stats: Arc<S>,
    events: mpsc::UnboundedSender<ComputationEvent>,
    epoch: Epoch,
    snapshot: QuerySnapshot,
    period: Duration,
    num_simulations: u32,
) where
    S: StatsService + ?Sized,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let context = RequestContext::new(epoch);
        epoch_debug!(epoch, "📤 Confidence interval request {}", context.request_id);

        let outcome = stats
            .compute_error_bars(snapshot.error_bars_request(num_simulations))
            .await
            .map(ConfidenceIntervalEstimate::from);

        if events.send(ComputationEvent::ConfidenceInterval { context, outcome }).is_err() {
            break;
        }
    }
}

/// Sweep the epsilons one request at a time and build the whole curve
///
/// Failed epsilons and responses without groups are omitted.
async fn run_tradeoff_sweep<S>(
    stats: &S,
    context: RequestContext,
    snapshot: &QuerySnapshot,
    epsilons: &[f64],
    num_simulations: u32,
) -> TradeoffCurve
where
    S: StatsService + ?Sized,
{
    let mut curve = TradeoffCurve::default();

    for &epsilon in epsilons {
        let request = snapshot.error_bars_request_at(epsilon, num_simulations);
        match stats.compute_error_bars(request).await {
            Ok(response) => match ConfidenceIntervalEstimate::from(response).rmse() {
                Some(rmse) => curve.points.push(TradeoffPoint { epsilon, rmse }),
                None => {
                    epoch_warn!(context.epoch, "⚠️ Sweep point ε={} omitted: no groups returned", epsilon);
                }
            },
            Err(e) => {
                epoch_warn!(context.epoch, "⚠️ Sweep point ε={} omitted: {}", epsilon, e);
            }
        }
    }

    curve
}
