//! Service implementations
//!
//! Real implementations of the service traits: the HTTP statistics client,
//! the in-process Laplace backend and the file-backed dataset cache.

pub mod dataset_cache;
pub mod local_stats;
pub mod stats_client;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use dataset_cache::RealDatasetCache;
pub use local_stats::LocalStatsService;
pub use stats_client::RealStatsService;
