use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time;

use crate::error::{Result, SyncError};
use crate::events::{ChangeEvent, ChangeKind, PendingChanges};
use crate::stats::SyncStats;
use crate::synchronizer::Synchronizer;

/// Published on the update channel after every sync cycle.
#[derive(Debug, Clone)]
pub struct SyncUpdate {
    pub completed_at: SystemTime,
    pub duration_ms: u64,
    pub stats: Option<SyncStats>,
    pub success: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncHealth {
    pub last_success: Option<SystemTime>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub last_duration_ms: Option<u64>,
    pub pending_events: usize,
    pub syncing: bool,
}

impl SyncHealth {
    fn initial() -> Self {
        Self {
            last_success: None,
            last_error: None,
            consecutive_failures: 0,
            last_duration_ms: None,
            pending_events: 0,
            syncing: false,
        }
    }
}

#[derive(Debug)]
pub enum SyncCommand {
    Trigger { reason: String },
    Shutdown,
}

/// Watches a root with notify and drives the Synchronizer.
///
/// The loop owns the Synchronizer outright, so every cache mutation goes
/// through this one task. A started batch always runs to completion;
/// shutdown only prevents new batches.
#[derive(Clone)]
pub struct SyncWatcher {
    inner: Arc<SyncWatcherInner>,
}

struct SyncWatcherInner {
    command_tx: mpsc::Sender<SyncCommand>,
    update_tx: broadcast::Sender<SyncUpdate>,
    health_rx: watch::Receiver<SyncHealth>,
    loop_task: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
    _watcher: std::sync::Mutex<Option<RecommendedWatcher>>,
}

impl SyncWatcher {
    /// Start watching; the Synchronizer moves into the loop task.
    pub fn start(synchronizer: Synchronizer) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(1024);
        let (command_tx, command_rx) = mpsc::channel(16);
        let (health_tx, health_rx) = watch::channel(SyncHealth::initial());
        let (update_tx, _) = broadcast::channel(32);

        let watcher = create_fs_watcher(synchronizer.root(), event_tx)?;

        let loop_task =
            spawn_sync_loop(synchronizer, event_rx, command_rx, update_tx.clone(), health_tx);

        Ok(Self {
            inner: Arc::new(SyncWatcherInner {
                command_tx,
                update_tx,
                health_rx,
                loop_task: std::sync::Mutex::new(Some(loop_task)),
                _watcher: std::sync::Mutex::new(Some(watcher)),
            }),
        })
    }

    /// Ask for an immediate full rescan.
    pub async fn trigger(&self, reason: impl Into<String>) -> Result<()> {
        self.inner
            .command_tx
            .send(SyncCommand::Trigger {
                reason: reason.into(),
            })
            .await
            .map_err(|e| SyncError::Other(format!("failed to send trigger: {e}")))
    }

    /// Stop the loop and wait for it to exit. An already-started batch
    /// runs to completion; this resolves only once the loop task is done,
    /// so callers can drop the runtime without cancelling mid-flight work.
    pub async fn shutdown(&self) {
        let _ = self.inner.command_tx.send(SyncCommand::Shutdown).await;
        let handle = self.inner.loop_task.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<SyncUpdate> {
        self.inner.update_tx.subscribe()
    }

    #[must_use]
    pub fn health_snapshot(&self) -> SyncHealth {
        self.inner.health_rx.borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<SyncHealth> {
        self.inner.health_rx.clone()
    }
}

impl Drop for SyncWatcher {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(SyncCommand::Shutdown);
        }
    }
}

fn create_fs_watcher(
    root: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = sender.blocking_send(res);
        },
        NotifyConfig::default(),
    )
    .map_err(|e| SyncError::Other(format!("watcher init failed: {e}")))?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| SyncError::Other(format!("failed to watch {}: {e}", root.display())))?;
    Ok(watcher)
}

fn spawn_sync_loop(
    mut synchronizer: Synchronizer,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut command_rx: mpsc::Receiver<SyncCommand>,
    update_tx: broadcast::Sender<SyncUpdate>,
    health_tx: watch::Sender<SyncHealth>,
) -> tokio::task::JoinHandle<()> {
    let debounce = synchronizer.config().debounce_window();
    let max_wait = synchronizer.config().max_batch_wait();

    tokio::spawn(async move {
        let mut pending = PendingChanges::new(debounce, max_wait);
        let mut health = SyncHealth::initial();

        loop {
            let next_deadline = pending.next_deadline();

            tokio::select! {
                Some(event) = event_rx.recv() => {
                    if record_fs_event(&synchronizer, event, &mut pending) {
                        health.pending_events = pending.len();
                        let _ = health_tx.send(health.clone());
                    }
                }
                Some(cmd) = command_rx.recv() => {
                    match cmd {
                        SyncCommand::Trigger { reason } => {
                            pending.drain_all();
                            run_cycle(
                                &mut synchronizer,
                                None,
                                &reason,
                                &mut health,
                                &health_tx,
                                &update_tx,
                            )
                            .await;
                        }
                        SyncCommand::Shutdown => break,
                    }
                }
                () = async {
                    if let Some(deadline) = next_deadline {
                        time::sleep_until(time::Instant::from_std(deadline)).await;
                    }
                }, if next_deadline.is_some() => {
                    let drained = pending.drain_due(Instant::now());
                    // Event kinds are hints; the filesystem and cache at
                    // drain time decide what actually happens.
                    let events: Vec<ChangeEvent> = drained
                        .into_iter()
                        .filter_map(|e| synchronizer.revalidate(e))
                        .collect();
                    if events.is_empty() {
                        health.pending_events = pending.len();
                        let _ = health_tx.send(health.clone());
                        continue;
                    }
                    run_cycle(
                        &mut synchronizer,
                        Some(events),
                        "fs_events",
                        &mut health,
                        &health_tx,
                        &update_tx,
                    )
                    .await;
                    health.pending_events = pending.len();
                    let _ = health_tx.send(health.clone());
                }
                else => break,
            }
        }
        info!("sync loop stopped");
    })
}

/// Translate a notify event into pending change records. Returns whether
/// anything was queued.
fn record_fs_event(
    synchronizer: &Synchronizer,
    event: notify::Result<Event>,
    pending: &mut PendingChanges,
) -> bool {
    let event = match event {
        Ok(event) => event,
        Err(e) => {
            warn!("watch error: {e}");
            return false;
        }
    };
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Deleted,
        EventKind::Access(_) => return false,
    };

    let mut queued = false;
    let now = now_ms();
    for path in &event.paths {
        if path.is_dir() || !synchronizer.in_scope(path) {
            continue;
        }
        let key = synchronizer.config().relative_key(path);
        pending.record(ChangeEvent::new(key, kind, now));
        queued = true;
    }
    queued
}

async fn run_cycle(
    synchronizer: &mut Synchronizer,
    events: Option<Vec<ChangeEvent>>,
    reason: &str,
    health: &mut SyncHealth,
    health_tx: &watch::Sender<SyncHealth>,
    update_tx: &broadcast::Sender<SyncUpdate>,
) {
    health.syncing = true;
    let _ = health_tx.send(health.clone());
    let started = Instant::now();

    let outcome = match events {
        Some(events) => synchronizer.process_batch(events).await,
        None => synchronizer.full_rescan().await,
    };
    let duration_ms = started.elapsed().as_millis() as u64;
    health.syncing = false;
    health.last_duration_ms = Some(duration_ms);

    match outcome {
        Ok(stats) => {
            health.last_success = Some(SystemTime::now());
            health.last_error = None;
            health.consecutive_failures = 0;
            let _ = update_tx.send(SyncUpdate {
                completed_at: SystemTime::now(),
                duration_ms,
                stats: Some(stats),
                success: true,
                reason: reason.to_string(),
            });
        }
        Err(e) => {
            error!("sync cycle failed ({reason}): {e}");
            health.last_error = Some(e.to_string());
            health.consecutive_failures += 1;
            let _ = update_tx.send(SyncUpdate {
                completed_at: SystemTime::now(),
                duration_ms,
                stats: None,
                success: false,
                reason: reason.to_string(),
            });
        }
    }
    let _ = health_tx.send(health.clone());
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
