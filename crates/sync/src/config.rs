use std::path::{Path, PathBuf};
use std::time::Duration;

use chunkdex_chunker::ChunkerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Directory name for persisted state under the watched root.
pub const STATE_DIR_NAME: &str = ".chunkdex";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root of the watched tree.
    pub root: PathBuf,
    pub chunker: ChunkerConfig,
    /// Globs relative to the root; empty means every file.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_file_size_bytes: u64,
    pub max_files_per_scan: usize,
    /// Maximum documents per `on_chunks_ready` call.
    pub max_batch_size: usize,
    /// Quiet window after the last event for a path.
    pub debounce_window_ms: u64,
    /// Upper bound on how long a trickle of events can defer a flush.
    pub max_batch_wait_ms: u64,
}

impl SyncConfig {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunker: ChunkerConfig::default(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            max_file_size_bytes: 1024 * 1024,
            max_files_per_scan: 50_000,
            max_batch_size: 64,
            debounce_window_ms: 2_000,
            max_batch_wait_ms: 10_000,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.chunker
            .validate()
            .map_err(|e| SyncError::invalid_config(e.to_string()))?;
        if self.max_batch_size == 0 {
            return Err(SyncError::invalid_config("max_batch_size must be positive"));
        }
        if self.max_files_per_scan == 0 {
            return Err(SyncError::invalid_config(
                "max_files_per_scan must be positive",
            ));
        }
        if self.max_batch_wait_ms < self.debounce_window_ms {
            return Err(SyncError::invalid_config(
                "max_batch_wait_ms must be at least debounce_window_ms",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR_NAME)
    }

    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.state_dir().join("hash_cache.json")
    }

    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir().join("ledger.json")
    }

    #[must_use]
    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    #[must_use]
    pub const fn max_batch_wait(&self) -> Duration {
        Duration::from_millis(self.max_batch_wait_ms)
    }

    /// Path relative to the root, forward slashes, for cache and ledger keys.
    #[must_use]
    pub fn relative_key(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.to_string_lossy().replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SyncConfig::new("/tmp/project").validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = SyncConfig::new("/tmp/project");
        config.max_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn batch_wait_must_cover_debounce() {
        let mut config = SyncConfig::new("/tmp/project");
        config.debounce_window_ms = 5_000;
        config.max_batch_wait_ms = 1_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn relative_key_strips_root() {
        let config = SyncConfig::new("/work/app");
        assert_eq!(
            config.relative_key(Path::new("/work/app/src/main.rs")),
            "src/main.rs"
        );
    }
}
