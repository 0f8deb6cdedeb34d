//! Chunk-to-document enrichment.
//!
//! Turns raw [`chunkdex_chunker::Chunk`]s into [`Document`]s ready for an
//! embedding layer: content hash for change detection, extracted symbols,
//! a code-type classification, and complexity/importance scores.
//!
//! ```text
//! Chunk ──► DocumentConverter ──► Document { hash, symbols, context }
//!                 │
//!                 └─ to_chunk() reverses the shared fields
//! ```

mod convert;
mod error;
mod hash;
mod types;

pub use convert::{BatchConversion, DocumentConverter};
pub use error::{ConvertError, Result};
pub use hash::content_hash;
pub use types::{CodeType, ContextInfo, DocImportance, Document, FileKind};
