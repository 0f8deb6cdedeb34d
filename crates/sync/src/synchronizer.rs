use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chunkdex_chunker::Chunker;
use chunkdex_documents::{content_hash, DocumentConverter};
use log::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::events::{ChangeEvent, ChangeKind};
use crate::hash_cache::{FileHashRecord, HashCache};
use crate::ledger::DocumentLedger;
use crate::scanner::FileScanner;
use crate::sink::DocumentSink;
use crate::stats::SyncStats;

/// Output of the per-file read/chunk/convert pipeline.
struct ProcessedFile {
    key: String,
    kind: ChangeKind,
    content_hash: String,
    last_modified_ms: u64,
    size: u64,
    chunk_count: usize,
    documents: Vec<chunkdex_documents::Document>,
    convert_errors: usize,
}

/// Drives the directory tree into the sink and keeps the hash cache and
/// ledger in step with what the sink has acknowledged.
///
/// All cache and ledger mutation happens on the task that owns the
/// Synchronizer; the watch loop holds it exclusively, so there is a
/// single writer by construction.
pub struct Synchronizer {
    config: SyncConfig,
    scanner: FileScanner,
    sink: Arc<dyn DocumentSink>,
    cache: HashCache,
    ledger: DocumentLedger,
}

impl Synchronizer {
    /// Build with state loaded from the root's `.chunkdex` directory.
    pub fn new(config: SyncConfig, sink: Arc<dyn DocumentSink>) -> Result<Self> {
        let cache = HashCache::load(&config.cache_path())?;
        let ledger = DocumentLedger::load(&config.ledger_path())?;
        Self::with_state(config, sink, cache, ledger)
    }

    /// Build with explicitly injected state. The cache and ledger are
    /// owned here; nothing global.
    pub fn with_state(
        config: SyncConfig,
        sink: Arc<dyn DocumentSink>,
        cache: HashCache,
        ledger: DocumentLedger,
    ) -> Result<Self> {
        config.validate()?;
        let scanner = FileScanner::new(&config)?;
        Ok(Self {
            config,
            scanner,
            sink,
            cache,
            ledger,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn tracked_files(&self) -> usize {
        self.cache.len()
    }

    /// Whether a path is inside the sync scope at all.
    #[must_use]
    pub fn in_scope(&self, path: &Path) -> bool {
        self.scanner.matches(path)
    }

    /// Walk the tree, diff against the cache, and process the resulting
    /// events. A second rescan with no intervening edits is a no-op.
    pub async fn full_rescan(&mut self) -> Result<SyncStats> {
        let files = self.scanner.scan();
        let events = self.diff_against_cache(&files);
        info!(
            "rescan: {} files on disk, {} changes against cache",
            files.len(),
            events.len()
        );
        self.process_batch(events).await
    }

    /// Compare the on-disk tree with the cache. Matching mtime and size
    /// short-circuits the read; otherwise content is rehashed.
    fn diff_against_cache(&mut self, files: &[PathBuf]) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        let now = now_ms();

        for path in files {
            let key = self.config.relative_key(path);
            seen.insert(key.clone());

            let Ok(meta) = std::fs::metadata(path) else {
                warn!("cannot stat {}, skipping", path.display());
                continue;
            };
            let mtime = mtime_ms(&meta);
            let size = meta.len();

            let cached = self.cache.get(&key).cloned();
            if let Some(record) = &cached {
                if record.last_modified_ms == mtime && record.size == size {
                    continue;
                }
            }

            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("cannot read {}: {e}", path.display());
                    continue;
                }
            };
            let Some(content) = decode_text(&key, bytes) else {
                continue;
            };
            let hash = content_hash(&content);
            match cached {
                None => {
                    let mut event = ChangeEvent::new(key, ChangeKind::Created, now);
                    event.current_hash = Some(hash);
                    events.push(event);
                }
                Some(record) if record.content_hash != hash => {
                    let mut event = ChangeEvent::new(key, ChangeKind::Modified, now);
                    event.previous_hash = Some(record.content_hash);
                    event.current_hash = Some(hash);
                    events.push(event);
                }
                Some(_) => {
                    // Touched but unchanged: refresh the metadata so the
                    // next rescan short-circuits again.
                    self.cache.insert(FileHashRecord {
                        file_path: key.clone(),
                        content_hash: hash,
                        last_modified_ms: mtime,
                        size,
                    });
                }
            }
        }

        for key in self.cache.paths() {
            if !seen.contains(key) {
                let mut event = ChangeEvent::new(key, ChangeKind::Deleted, now);
                event.previous_hash =
                    self.cache.get(key).map(|r| r.content_hash.clone());
                events.push(event);
            }
        }
        events
    }

    /// Re-check an event's kind against the filesystem and cache. Watcher
    /// notifications are best-effort; what matters is the state at drain
    /// time.
    #[must_use]
    pub fn revalidate(&self, event: ChangeEvent) -> Option<ChangeEvent> {
        let exists = self.config.root.join(&event.path).is_file();
        let cached = self.cache.contains(&event.path);
        let kind = match (exists, cached) {
            (true, true) => ChangeKind::Modified,
            (true, false) => ChangeKind::Created,
            (false, true) => ChangeKind::Deleted,
            (false, false) => return None,
        };
        Some(ChangeEvent { kind, ..event })
    }

    /// Apply one batch: deletions, then modifications, then creations.
    /// Cache and ledger entries for a file are committed only after the
    /// sink call for that file resolves.
    pub async fn process_batch(&mut self, events: Vec<ChangeEvent>) -> Result<SyncStats> {
        let started = Instant::now();
        let mut stats = SyncStats::new();

        let (deletions, mut changes): (Vec<_>, Vec<_>) = events
            .into_iter()
            .partition(|e| e.kind == ChangeKind::Deleted);

        if !deletions.is_empty() {
            self.process_deletions(&deletions, &mut stats).await;
        }

        // Modifications before creations; their removals must land first.
        changes.sort_by_key(|e| match e.kind {
            ChangeKind::Modified => 0,
            _ => 1,
        });
        if !changes.is_empty() {
            self.process_changes(changes, &mut stats).await?;
        }

        self.persist_state()?;
        stats.time_ms = started.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// One removal call covering every live id for the deleted paths.
    async fn process_deletions(&mut self, deletions: &[ChangeEvent], stats: &mut SyncStats) {
        let mut ids = Vec::new();
        for event in deletions {
            ids.extend_from_slice(self.ledger.get(&event.path));
        }
        debug!("removing {} documents for {} deleted paths", ids.len(), deletions.len());

        if !ids.is_empty() {
            if let Err(e) = self.sink.on_documents_removed(&ids).await {
                error!("sink rejected removal batch: {e}");
                stats.add_error();
                return;
            }
        }
        for event in deletions {
            self.ledger.remove(&event.path);
            self.cache.remove(&event.path);
        }
        stats.add_removed(ids.len());
    }

    /// Read/chunk/convert changed files across a bounded pool, then flush
    /// and commit each file sequentially.
    async fn process_changes(
        &mut self,
        changes: Vec<ChangeEvent>,
        stats: &mut SyncStats,
    ) -> Result<()> {
        // Mixed IO + CPU; a small adaptive cap avoids spikes on large runs.
        let max_concurrent = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(2, 8);

        for window in changes.chunks(max_concurrent) {
            let mut tasks = Vec::with_capacity(window.len());
            for event in window {
                let abs = self.config.root.join(&event.path);
                let key = event.path.clone();
                let kind = event.kind;
                let chunker_config = self.config.chunker.clone();
                tasks.push(tokio::spawn(async move {
                    process_file(abs, key, kind, chunker_config).await
                }));
            }

            for task in tasks {
                match task.await {
                    Ok(Ok(Some(processed))) => {
                        self.commit_file(processed, stats).await;
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(msg)) => {
                        warn!("{msg}");
                        stats.add_error();
                    }
                    Err(e) => {
                        error!("file task panicked: {e}");
                        stats.add_error();
                    }
                }
            }
        }
        Ok(())
    }

    /// Flush one file's documents and, only once the sink has resolved,
    /// commit its cache record and ledger entry.
    async fn commit_file(&mut self, processed: ProcessedFile, stats: &mut SyncStats) {
        // Unchanged content under a Modified event: refresh metadata only.
        if processed.kind == ChangeKind::Modified {
            if let Some(record) = self.cache.get(&processed.key) {
                if record.content_hash == processed.content_hash {
                    debug!("{}: rehash matches cache, skipping", processed.key);
                    self.cache.insert(FileHashRecord {
                        file_path: processed.key,
                        content_hash: processed.content_hash,
                        last_modified_ms: processed.last_modified_ms,
                        size: processed.size,
                    });
                    return;
                }
            }
            let old_ids = self.ledger.get(&processed.key).to_vec();
            if !old_ids.is_empty() {
                if let Err(e) = self.sink.on_documents_removed(&old_ids).await {
                    error!("{}: sink rejected stale-document removal: {e}", processed.key);
                    stats.add_error();
                    return;
                }
                stats.add_removed(old_ids.len());
            }
        }

        let ids: Vec<String> = processed.documents.iter().map(|d| d.id.clone()).collect();
        for slice in processed.documents.chunks(self.config.max_batch_size.max(1)) {
            if let Err(e) = self.sink.on_chunks_ready(slice).await {
                // Cache record untouched: the next cycle retries this file.
                error!("{}: sink rejected document batch: {e}", processed.key);
                stats.add_error();
                return;
            }
        }

        self.cache.insert(FileHashRecord {
            file_path: processed.key.clone(),
            content_hash: processed.content_hash,
            last_modified_ms: processed.last_modified_ms,
            size: processed.size,
        });
        self.ledger.set_documents(processed.key, ids);
        stats.add_file();
        stats.add_chunks(processed.chunk_count);
        stats.add_documents(processed.documents.len());
        for _ in 0..processed.convert_errors {
            stats.add_error();
        }
    }

    fn persist_state(&self) -> Result<()> {
        self.cache.save(&self.config.cache_path())?;
        self.ledger.save(&self.config.ledger_path())?;
        Ok(())
    }
}

/// Read, chunk, and convert one file. Runs on the worker pool; stages for
/// a single file are strictly sequential. `Ok(None)` means the file
/// vanished before we got to it.
async fn process_file(
    abs: PathBuf,
    key: String,
    kind: ChangeKind,
    chunker_config: chunkdex_chunker::ChunkerConfig,
) -> std::result::Result<Option<ProcessedFile>, String> {
    let bytes = match tokio::fs::read(&abs).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(format!("{}: {e}", abs.display())),
    };
    let Some(content) = decode_text(&key, bytes) else {
        return Ok(None);
    };
    let meta = tokio::fs::metadata(&abs)
        .await
        .map_err(|e| format!("{}: {e}", abs.display()))?;
    let last_modified_ms = mtime_ms(&meta);

    let chunker =
        Chunker::new(chunker_config).map_err(|e| format!("{key}: {e}"))?;
    let chunks = chunker
        .chunk_text(&key, &content)
        .map_err(|e| format!("{key}: {e}"))?;
    let batch = DocumentConverter::new().to_documents(&chunks, last_modified_ms);

    Ok(Some(ProcessedFile {
        key,
        kind,
        content_hash: content_hash(&content),
        last_modified_ms,
        size: meta.len(),
        chunk_count: chunks.len(),
        documents: batch.documents,
        convert_errors: batch.errors.len(),
    }))
}

/// Decode raw file bytes for indexing. Binary content (NUL byte) is
/// skipped outright; a stray invalid sequence in otherwise-text content
/// is replaced so the file still gets indexed and hashed consistently.
fn decode_text(key: &str, bytes: Vec<u8>) -> Option<String> {
    if bytes.contains(&0) {
        debug!("{key}: binary content, skipping");
        return None;
    }
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("{key}: invalid UTF-8, indexing with replacement characters");
            Some(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn mtime_ms(meta: &std::fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_millis() as u64)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
