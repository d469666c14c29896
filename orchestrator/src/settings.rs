//! Runtime settings for the analysis engine
//!
//! ## Configuration Sources
//! Settings are loaded from:
//! 1. `.env` file in the current directory or parent directories (if present)
//! 2. System environment variables
//! 3. Command line flags (applied by the binary on top of the above)
//!
//! ## Variables
//! - `DPX_SERVICE_URL`: base URL of the statistics service
//! - `DPX_POLL_INTERVAL_MS`: confidence-interval poll period
//! - `DPX_NUM_SIMULATIONS`: simulated draws per error-bar request
//! - `DPX_SWEEP_EPSILONS`: comma separated tradeoff sweep epsilons
//! - `DPX_REQUEST_TIMEOUT_SECS`: per-request HTTP timeout
//! - `DPX_CACHE_PATH`: file holding the last uploaded dataset text

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::core::SWEEP_EPSILONS;
use crate::error::{OrchestratorError, OrchestratorResult};

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5050/";
pub const DEFAULT_NUM_SIMULATIONS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub service_url: Url,
    pub poll_interval: Duration,
    pub num_simulations: u32,
    pub sweep_epsilons: Vec<f64>,
    pub request_timeout: Duration,
    pub cache_path: PathBuf,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            poll_interval: Duration::from_secs(1),
            num_simulations: DEFAULT_NUM_SIMULATIONS,
            sweep_epsilons: SWEEP_EPSILONS.to_vec(),
            request_timeout: Duration::from_secs(30),
            cache_path: PathBuf::from("./.dp-explorer/dataset.csv"),
        }
    }
}

fn default_service_url() -> Url {
    Url::parse(DEFAULT_SERVICE_URL).expect("default service URL is valid")
}

impl AnalysisSettings {
    /// Defaults overridden by `.env` and environment variables
    pub fn from_env() -> OrchestratorResult<Self> {
        // Missing .env is fine
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> OrchestratorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(url) = lookup("DPX_SERVICE_URL") {
            settings.service_url = parse_service_url(&url)?;
        }
        if let Some(ms) = lookup("DPX_POLL_INTERVAL_MS") {
            let ms: u64 = parse_field("DPX_POLL_INTERVAL_MS", &ms)?;
            if ms == 0 {
                return Err(OrchestratorError::invalid_config("DPX_POLL_INTERVAL_MS must be positive"));
            }
            settings.poll_interval = Duration::from_millis(ms);
        }
        if let Some(count) = lookup("DPX_NUM_SIMULATIONS") {
            settings.num_simulations = parse_field("DPX_NUM_SIMULATIONS", &count)?;
        }
        if let Some(list) = lookup("DPX_SWEEP_EPSILONS") {
            settings.sweep_epsilons = parse_epsilon_list(&list)?;
        }
        if let Some(secs) = lookup("DPX_REQUEST_TIMEOUT_SECS") {
            settings.request_timeout = Duration::from_secs(parse_field("DPX_REQUEST_TIMEOUT_SECS", &secs)?);
        }
        if let Some(path) = lookup("DPX_CACHE_PATH") {
            settings.cache_path = PathBuf::from(path);
        }

        Ok(settings)
    }
}

/// Parse a base URL, making sure relative endpoint joins keep its path
pub fn parse_service_url(raw: &str) -> OrchestratorResult<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| OrchestratorError::invalid_config(format!("service URL '{raw}': {e}")))
}

/// Parse "0.1, 0.5,1" into ascending positive epsilons
pub fn parse_epsilon_list(raw: &str) -> OrchestratorResult<Vec<f64>> {
    let mut values = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let value: f64 = parse_field("epsilon", item)?;
        if !(value.is_finite() && value > 0.0) {
            return Err(OrchestratorError::invalid_config(format!("epsilon must be positive, got {item}")));
        }
        values.push(value);
    }
    values.sort_by(f64::total_cmp);
    values.dedup();
    Ok(values)
}

fn parse_field<T: std::str::FromStr>(field: &str, raw: &str) -> OrchestratorResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| OrchestratorError::invalid_config(format!("{field} = '{raw}': {e}")))
}
