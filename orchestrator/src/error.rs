//! Orchestrator-specific error types

use shared::SharedError;
use thiserror::Error;

const SUPERSEDED: &str = "superseded by a configuration change";

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Dataset text could not be turned into a dataset
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    /// A computation was requested while the configuration is not computable
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// The statistics service could not be reached, answered non-2xx, or answered nonsense
    #[error("Transport failure during {operation}: {message}")]
    TransportFailure { operation: String, message: String },

    /// A request finished but its result could not be applied
    #[error("{operation} failed: {message}")]
    ComputationFailed { operation: String, message: String },

    #[error("Dataset cache operation failed: {operation} on {path}")]
    CacheError { operation: String, path: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput { message: message.into() }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { reason: reason.into() }
    }

    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportFailure {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn computation_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ComputationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// A valid request whose result arrived after the configuration moved on
    pub fn superseded(operation: impl Into<String>) -> Self {
        Self::computation_failed(operation, SUPERSEDED)
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::ComputationFailed { message, .. } if message == SUPERSEDED)
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }
}

impl From<csv::Error> for OrchestratorError {
    fn from(error: csv::Error) -> Self {
        Self::malformed(error.to_string())
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
