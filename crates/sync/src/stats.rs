use serde::{Deserialize, Serialize};

/// Counters for one sync cycle.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SyncStats {
    pub files: usize,
    pub chunks: usize,
    pub documents: usize,
    pub removed_documents: usize,
    pub errors: usize,
    pub time_ms: u64,
}

impl SyncStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self) {
        self.files += 1;
    }

    pub fn add_chunks(&mut self, count: usize) {
        self.chunks += count;
    }

    pub fn add_documents(&mut self, count: usize) {
        self.documents += count;
    }

    pub fn add_removed(&mut self, count: usize) {
        self.removed_documents += count;
    }

    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.errors == 0
    }
}
