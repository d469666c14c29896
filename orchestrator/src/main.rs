//! Main entry point for the orchestrator binary
//!
//! Loads a dataset (or restores the cached one), applies the query
//! configuration from the command line, fetches a point estimate and then
//! watches the confidence-interval poll and tradeoff sweep for a while before
//! printing the final analysis view as JSON.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::signal;

use orchestrator::{
    AnalysisSettings, ConfigUpdate, DatasetCache, Orchestrator, OrchestratorResult, SessionCommand, StatsService,
    services::{LocalStatsService, RealDatasetCache, RealStatsService},
    settings::parse_service_url,
};
use shared::{Statistic, logging};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// External statistics service over HTTP
    Http,
    /// In-process Laplace noise, no service needed
    Local,
}

/// Differential-privacy explorer: compare private and exact group statistics
#[derive(Parser, Debug)]
#[command(name = "orchestrator")]
#[command(about = "Explores privacy/utility tradeoffs of differentially private group statistics")]
pub struct Args {
    /// Delimited text file with a header row (defaults to the cached dataset)
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Column to group rows by
    #[arg(long)]
    pub group_by: Option<String>,

    /// Statistic per group (mean, count, percent)
    #[arg(long)]
    pub statistic: Option<Statistic>,

    /// Numeric column the statistic is computed over
    #[arg(long)]
    pub measure: Option<String>,

    /// Privacy budget
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Statistics service base URL (overrides DPX_SERVICE_URL)
    #[arg(long)]
    pub service_url: Option<String>,

    /// Where noisy statistics come from
    #[arg(long, value_enum, default_value = "http")]
    pub backend: Backend,

    /// How long to watch the background computations before printing
    #[arg(long, default_value = "5")]
    pub watch_seconds: u64,

    /// Extra epsilons for the multi-epsilon exploration, comma separated
    #[arg(long, value_delimiter = ',')]
    pub epsilons: Vec<f64>,

    /// Dataset cache file (overrides DPX_CACHE_PATH)
    #[arg(long)]
    pub cache_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> OrchestratorResult<()> {
    // Parse command line arguments
    let args = Args::parse();
    logging::init_tracing_with_level(Some(&args.log_level));

    let mut settings = AnalysisSettings::from_env()?;
    if let Some(url) = &args.service_url {
        settings.service_url = parse_service_url(url)?;
    }
    if let Some(path) = &args.cache_path {
        settings.cache_path = path.clone();
    }

    let cache = RealDatasetCache::new(settings.cache_path.clone());
    match args.backend {
        Backend::Http => {
            let stats = RealStatsService::from_settings(&settings)?;
            tracing::debug!("🌐 Using statistics service at {}", stats.base_url());
            run_session(stats, cache, settings, args).await
        }
        Backend::Local => {
            tracing::debug!("🎲 Using in-process Laplace backend");
            run_session(LocalStatsService::new(), cache, settings, args).await
        }
    }
}

async fn run_session<S, C>(stats: S, cache: C, settings: AnalysisSettings, args: Args) -> OrchestratorResult<()>
where
    S: StatsService + 'static,
    C: DatasetCache + 'static,
{
    let mut orchestrator = Orchestrator::new(stats, cache, settings);

    match &args.dataset {
        Some(path) => {
            let raw_text = tokio::fs::read_to_string(path).await?;
            orchestrator.load_dataset(&raw_text).await?;
        }
        None => match orchestrator.restore_from_cache().await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("No dataset given and none cached"),
            Err(e) => logging::log_error("Dataset cache restore", &e),
        },
    }

    // Configuration from the command line
    if let Some(group_by) = &args.group_by {
        orchestrator.update(ConfigUpdate::GroupBy(Some(group_by.clone())));
    }
    if let Some(statistic) = args.statistic {
        orchestrator.update(ConfigUpdate::Statistic(statistic));
    }
    if let Some(measure) = &args.measure {
        orchestrator.update(ConfigUpdate::Measure(Some(measure.clone())));
    }
    if let Some(epsilon) = args.epsilon {
        orchestrator.update(ConfigUpdate::Epsilon(epsilon));
    }
    for epsilon in &args.epsilons {
        if !orchestrator.add_exploration_epsilon(*epsilon) {
            tracing::debug!("Exploration epsilon {} ignored", epsilon);
        }
    }

    let view = orchestrator.view();
    if !view.computable {
        tracing::warn!(
            "⏸️ Nothing to compute: {}",
            view.blocking_reason.as_deref().unwrap_or("configuration incomplete")
        );
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if let Err(e) = orchestrator.compute_point_estimate().await {
        logging::log_error("Point estimate", &e);
    }

    // Stop after the watch window or on Ctrl+C, whichever comes first
    let shutdown_sender = orchestrator.command_sender();
    let watch_window = Duration::from_secs(args.watch_seconds);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(watch_window) => {},
            result = signal::ctrl_c() => {
                if let Err(err) = result {
                    logging::log_error("Signal handling", &err);
                }
            }
        }
        let _ = shutdown_sender.send(SessionCommand::Shutdown).await;
    });

    orchestrator.run().await?;
    println!("{}", serde_json::to_string_pretty(&orchestrator.view())?);

    if !args.epsilons.is_empty() {
        match orchestrator.explore_epsilons().await {
            Ok(reports) => println!("{}", serde_json::to_string_pretty(&reports)?),
            Err(e) => logging::log_error("Epsilon exploration", &e),
        }
    }

    logging::log_success("Session finished");
    Ok(())
}
