use async_trait::async_trait;
use chunkdex_documents::Document;

use crate::error::Result;

/// Receiving end of the pipeline: the embedding/vector layer implements
/// this. The Synchronizer awaits both calls before committing hash-cache
/// records, so a sink that fails sees the same batch again next cycle.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// A batch of enriched documents, at most `max_batch_size` long.
    async fn on_chunks_ready(&self, documents: &[Document]) -> Result<()>;

    /// Document ids that no longer exist and must be dropped downstream.
    async fn on_documents_removed(&self, document_ids: &[String]) -> Result<()>;
}

/// Discards everything. Useful for dry runs and as a test stand-in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl DocumentSink for NullSink {
    async fn on_chunks_ready(&self, _documents: &[Document]) -> Result<()> {
        Ok(())
    }

    async fn on_documents_removed(&self, _document_ids: &[String]) -> Result<()> {
        Ok(())
    }
}
