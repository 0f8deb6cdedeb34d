use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use log::{debug, info, warn};

use crate::config::{SyncConfig, STATE_DIR_NAME};
use crate::error::{Result, SyncError};

/// Gitignore-aware file discovery under the configured root.
pub struct FileScanner {
    root: PathBuf,
    include: Option<GlobSet>,
    exclude: GlobSet,
    max_file_size: u64,
    max_files: usize,
}

impl FileScanner {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let include = if config.include_patterns.is_empty() {
            None
        } else {
            Some(build_globset(&config.include_patterns)?)
        };
        let exclude = build_globset(&config.exclude_patterns)?;
        Ok(Self {
            root: config.root.clone(),
            include,
            exclude,
            max_file_size: config.max_file_size_bytes,
            max_files: config.max_files_per_scan,
        })
    }

    /// Walk the tree, honouring gitignore, patterns, and size limits.
    /// Unreadable entries are logged and skipped, never fatal.
    #[must_use]
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| name != STATE_DIR_NAME)
        });

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("failed to read entry: {e}");
                    continue;
                }
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            if !self.matches(path) {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                if meta.len() > self.max_file_size {
                    debug!(
                        "skipping large file {} ({} bytes > {})",
                        path.display(),
                        meta.len(),
                        self.max_file_size
                    );
                    continue;
                }
            }

            if files.len() >= self.max_files {
                warn!("scan hit max_files_per_scan ({}), truncating", self.max_files);
                break;
            }
            files.push(path.to_path_buf());
        }

        info!("scan found {} files under {}", files.len(), self.root.display());
        files
    }

    /// Whether a path passes the include/exclude patterns. Used both when
    /// scanning and when filtering watcher events.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative
            .components()
            .any(|c| c.as_os_str() == STATE_DIR_NAME)
        {
            return false;
        }
        if self.exclude.is_match(relative) {
            return false;
        }
        match &self.include {
            Some(include) => include.is_match(relative),
            None => true,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| SyncError::invalid_config(format!("bad glob {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| SyncError::invalid_config(format!("glob set: {e}")))
}
