//! Shared logging utilities for consistent, epoch-tagged tracing

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Default filter directives for the given base level
pub fn filter_directives(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    format!("orchestrator={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize the stdout tracing subscriber with an optional log level
///
/// `RUST_LOG` takes precedence over the level passed in when it is set.
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)));

    // A second initialization (tests, embedded use) is not an error
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for epoch-aware info logging
#[macro_export]
macro_rules! epoch_info {
    ($epoch:expr, $($arg:tt)*) => {
        tracing::info!(
            epoch = %$epoch,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for epoch-aware warning logging
#[macro_export]
macro_rules! epoch_warn {
    ($epoch:expr, $($arg:tt)*) => {
        tracing::warn!(
            epoch = %$epoch,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for epoch-aware error logging
#[macro_export]
macro_rules! epoch_error {
    ($epoch:expr, $($arg:tt)*) => {
        tracing::error!(
            epoch = %$epoch,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for epoch-aware debug logging
#[macro_export]
macro_rules! epoch_debug {
    ($epoch:expr, $($arg:tt)*) => {
        tracing::debug!(
            epoch = %$epoch,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(details: &str) {
    info!(timestamp = format_timestamp(), "🚀 Starting {}", details);
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(reason: &str) {
    info!(timestamp = format_timestamp(), "🛑 Shutting down: {}", reason);
}

/// Contextual logging helper for error conditions
pub fn log_error(context: &str, error: &dyn std::fmt::Display) {
    error!(
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(message: &str) {
    info!(timestamp = format_timestamp(), "✅ {}", message);
}
