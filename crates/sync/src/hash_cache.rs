use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

const SCHEMA_VERSION: u32 = 1;

/// Last committed index state for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashRecord {
    pub file_path: String,
    pub content_hash: String,
    pub last_modified_ms: u64,
    pub size: u64,
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    schema_version: u32,
    records: BTreeMap<String, FileHashRecord>,
}

/// Persisted `path → FileHashRecord` map.
///
/// Explicitly owned and injected into the Synchronizer; there is no
/// process-wide instance. Records describe only state the sink has
/// acknowledged, so a diff against the cache re-emits anything that
/// failed mid-flight.
#[derive(Debug, Default, Clone)]
pub struct HashCache {
    records: BTreeMap<String, FileHashRecord>,
}

impl HashCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from disk. A missing file is a cold start, not an error; an
    /// unknown schema version is rejected rather than misread.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no hash cache at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(SyncError::read(path, e)),
        };
        let file: CacheFile = serde_json::from_str(&raw)?;
        if file.schema_version != SCHEMA_VERSION {
            return Err(SyncError::Schema {
                path: path.to_path_buf(),
                found: file.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        info!(
            "loaded hash cache: {} records from {}",
            file.records.len(),
            path.display()
        );
        Ok(Self {
            records: file.records,
        })
    }

    /// Atomic whole-store rewrite: write `*.tmp`, then rename over.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = CacheFile {
            schema_version: SCHEMA_VERSION,
            records: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileHashRecord> {
        self.records.get(path)
    }

    pub fn insert(&mut self, record: FileHashRecord) {
        self.records.insert(record.file_path.clone(), record);
    }

    pub fn remove(&mut self, path: &str) -> Option<FileHashRecord> {
        self.records.remove(path)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
