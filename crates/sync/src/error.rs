use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("chunker error: {0}")]
    Chunker(#[from] chunkdex_chunker::ChunkerError),

    #[error("conversion error: {0}")]
    Convert(#[from] chunkdex_documents::ConvertError),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported schema version {found} in {path} (expected {expected})")]
    Schema {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SyncError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
