//! HTTP statistics service client
//!
//! Posts JSON bodies to the statistics service. Connection errors, non-2xx
//! statuses and undecodable bodies all surface as `TransportFailure`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{
    ComputeStatsRequest, ComputeStatsResponse, ErrorBarsRequest, ErrorBarsResponse, MultiEpsilonRequest,
    MultiEpsilonResponse,
};
use tracing::debug;
use url::Url;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::settings::AnalysisSettings;
use crate::traits::StatsService;

pub const COMPUTE_STATS_PATH: &str = "api/compute-stats";
pub const COMPUTE_ERROR_BARS_PATH: &str = "api/compute-error-bars";
pub const COMPUTE_MULTI_EPSILON_PATH: &str = "api/compute-multi-epsilon";

/// Longest slice of an error body carried into the failure message
const ERROR_BODY_LIMIT: usize = 200;

/// Real statistics service reached over HTTP
#[derive(Clone)]
pub struct RealStatsService {
    base_url: Url,
    client: reqwest::Client,
}

impl RealStatsService {
    /// Create a client for the service rooted at `base_url`
    pub fn new(base_url: Url, timeout: Duration) -> OrchestratorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OrchestratorError::invalid_config(format!("HTTP client: {e}")))?;
        Ok(Self { base_url, client })
    }

    pub fn from_settings(settings: &AnalysisSettings) -> OrchestratorResult<Self> {
        Self::new(settings.service_url.clone(), settings.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> OrchestratorResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| OrchestratorError::invalid_config(format!("endpoint {path}: {e}")))
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> OrchestratorResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let operation = path.trim_start_matches("api/");
        debug!("📤 POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| OrchestratorError::transport(operation, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(OrchestratorError::transport(operation, format!("HTTP {status}: {snippet}")));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| OrchestratorError::transport(operation, format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl StatsService for RealStatsService {
    async fn compute_stats(&self, request: ComputeStatsRequest) -> OrchestratorResult<ComputeStatsResponse> {
        self.post_json(COMPUTE_STATS_PATH, &request).await
    }

    async fn compute_error_bars(&self, request: ErrorBarsRequest) -> OrchestratorResult<ErrorBarsResponse> {
        self.post_json(COMPUTE_ERROR_BARS_PATH, &request).await
    }

    async fn compute_multi_epsilon(&self, request: MultiEpsilonRequest) -> OrchestratorResult<MultiEpsilonResponse> {
        self.post_json(COMPUTE_MULTI_EPSILON_PATH, &request).await
    }
}
