//! Incremental synchronization between a directory tree and a document sink.
//!
//! ```text
//!  notify events ──► PendingChanges (debounce + coalesce)
//!                          │ deadline
//!  full_rescan ──► diff ───┴──► process_batch
//!                                 │ delete → modify → create
//!                                 ▼
//!                          DocumentSink (embedding layer)
//!                                 │ resolved
//!                                 ▼
//!                    HashCache + DocumentLedger commit
//! ```
//!
//! The Hash Cache records what the sink has last acknowledged; records are
//! only written after a sink call resolves, so a crashed or failed cycle
//! re-emits the same work (at-least-once).

mod config;
mod error;
mod events;
mod hash_cache;
mod ledger;
mod scanner;
mod sink;
mod stats;
mod synchronizer;
mod watcher;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use events::{coalesce, ChangeEvent, ChangeKind, PendingChanges};
pub use hash_cache::{FileHashRecord, HashCache};
pub use ledger::DocumentLedger;
pub use scanner::FileScanner;
pub use sink::{DocumentSink, NullSink};
pub use stats::SyncStats;
pub use synchronizer::Synchronizer;
pub use watcher::{SyncCommand, SyncHealth, SyncUpdate, SyncWatcher};
