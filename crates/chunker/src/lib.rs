//! # chunkdex Chunker
//!
//! Token-bounded text segmentation with boundary-aware cuts and
//! semantics-preserving overlap between adjacent segments.
//!
//! ## Pipeline
//!
//! ```text
//! File text
//!     │
//!     ├──> Tokenizer (unicode word spans)
//!     │      └─> TokenSpan[]
//!     │
//!     ├──> Boundary Analyzer (lexical patterns)
//!     │      └─> BoundaryCandidate[]
//!     │
//!     ├──> Chunker (budgeted, boundary-aware cuts)
//!     │      └─> gap-free Chunk[]
//!     │
//!     └──> Overlap Manager
//!            └─> Chunk[] with prefix/suffix context
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chunkdex_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//! let chunks = chunker.chunk_text("src/main.rs", "fn main() { println!(\"hi\"); }").unwrap();
//! for chunk in &chunks {
//!     println!("#{} lines {}-{} ({} tokens)",
//!              chunk.chunk_index, chunk.start_line, chunk.end_line, chunk.token_count);
//! }
//! ```

mod boundary;
mod chunker;
mod config;
mod error;
mod overlap;
mod tokenizer;
mod types;

pub use boundary::{BoundaryAnalyzer, BoundaryCandidate, BoundaryKind, Importance};
pub use chunker::Chunker;
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use overlap::{boundary_retention, OverlapManager, OverlapRegion};
pub use tokenizer::{TokenSpan, Tokenizer};
pub use types::{parse_chunk_id, stable_chunk_id, Chunk};
