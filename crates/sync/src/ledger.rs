use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct LedgerFile {
    schema_version: u32,
    documents: BTreeMap<String, Vec<String>>,
}

/// Persisted `path → document ids` map.
///
/// A deleted file can no longer be read or re-chunked, so the ledger is
/// the only complete record of which document ids a removal must cover.
#[derive(Debug, Default, Clone)]
pub struct DocumentLedger {
    documents: BTreeMap<String, Vec<String>>,
}

impl DocumentLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no ledger at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(SyncError::read(path, e)),
        };
        let file: LedgerFile = serde_json::from_str(&raw)?;
        if file.schema_version != SCHEMA_VERSION {
            return Err(SyncError::Schema {
                path: path.to_path_buf(),
                found: file.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(Self {
            documents: file.documents,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = LedgerFile {
            schema_version: SCHEMA_VERSION,
            documents: self.documents.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Replace the live document ids for a path.
    pub fn set_documents(&mut self, path: impl Into<String>, ids: Vec<String>) {
        self.documents.insert(path.into(), ids);
    }

    /// Drop a path, returning every id that was live for it.
    pub fn remove(&mut self, path: &str) -> Vec<String> {
        self.documents.remove(path).unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> &[String] {
        self.documents.get(path).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }

    #[must_use]
    pub fn total_documents(&self) -> usize {
        self.documents.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn remove_yields_every_live_id() {
        let mut ledger = DocumentLedger::new();
        ledger.set_documents("src/a.rs", vec!["id1".into(), "id2".into()]);
        assert_eq!(ledger.remove("src/a.rs"), vec!["id1", "id2"]);
        assert!(ledger.get("src/a.rs").is_empty());
        assert!(ledger.remove("src/a.rs").is_empty());
    }

    #[test]
    fn set_replaces_previous_ids() {
        let mut ledger = DocumentLedger::new();
        ledger.set_documents("src/a.rs", vec!["old".into()]);
        ledger.set_documents("src/a.rs", vec!["new1".into(), "new2".into()]);
        assert_eq!(ledger.get("src/a.rs"), ["new1", "new2"]);
        assert_eq!(ledger.total_documents(), 2);
    }

    #[test]
    fn ledger_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut ledger = DocumentLedger::new();
        ledger.set_documents("src/a.rs", vec!["x".into()]);
        ledger.save(&path).unwrap();

        let loaded = DocumentLedger::load(&path).unwrap();
        assert_eq!(loaded.get("src/a.rs"), ["x"]);
    }

    #[test]
    fn missing_ledger_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = DocumentLedger::load(&dir.path().join("none.json")).unwrap();
        assert_eq!(ledger.total_documents(), 0);
    }
}
