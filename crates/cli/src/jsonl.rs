use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chunkdex_documents::Document;
use chunkdex_sync::{DocumentSink, Result, SyncError};
use serde::Serialize;

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JsonlRecord<'a> {
    Upsert { documents: &'a [Document] },
    Remove { ids: &'a [String] },
}

enum Target {
    File(Mutex<File>),
    Stdout,
}

/// Sink that appends one JSON object per batch, either to a file or to
/// stdout. Stands in for a real embedding/vector backend.
pub struct JsonlSink {
    target: Target,
}

impl JsonlSink {
    pub fn open(path: Option<&Path>) -> anyhow::Result<Self> {
        let target = match path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Target::File(Mutex::new(file))
            }
            None => Target::Stdout,
        };
        Ok(Self { target })
    }

    fn write_line(&self, record: &JsonlRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(record)?;
        match &self.target {
            Target::File(file) => {
                let mut file = file
                    .lock()
                    .map_err(|_| SyncError::sink("jsonl file lock poisoned"))?;
                writeln!(file, "{line}").map_err(SyncError::Io)?;
            }
            Target::Stdout => println!("{line}"),
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for JsonlSink {
    async fn on_chunks_ready(&self, documents: &[Document]) -> Result<()> {
        self.write_line(&JsonlRecord::Upsert { documents })
    }

    async fn on_documents_removed(&self, document_ids: &[String]) -> Result<()> {
        self.write_line(&JsonlRecord::Remove { ids: document_ids })
    }
}
