//! File-backed dataset cache
//!
//! Keeps the raw text of the last successfully loaded dataset so a restart
//! can restore it. Writes go through a sibling temp file and a rename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::DatasetCache;

pub struct RealDatasetCache {
    path: PathBuf,
}

impl RealDatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn cache_error(&self, operation: &str, error: std::io::Error) -> OrchestratorError {
        debug!("Dataset cache {} failed: {}", operation, error);
        OrchestratorError::CacheError {
            operation: format!("{operation}: {error}"),
            path: self.path.display().to_string(),
        }
    }
}

#[async_trait]
impl DatasetCache for RealDatasetCache {
    async fn load(&self) -> OrchestratorResult<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.cache_error("read", e)),
        }
    }

    async fn store(&self, raw_text: &str) -> OrchestratorResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.cache_error("create directory", e))?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| self.cache_error("create", e))?;
        file.write_all(raw_text.as_bytes())
            .await
            .map_err(|e| self.cache_error("write", e))?;
        file.flush().await.map_err(|e| self.cache_error("flush", e))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.cache_error("rename", e))?;
        debug!("💾 Cached {} bytes of dataset text at {}", raw_text.len(), self.path.display());
        Ok(())
    }
}
