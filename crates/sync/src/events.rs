use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// One observed file change. Ephemeral: lives only until its batch is
/// processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
    pub timestamp_ms: u64,
    pub previous_hash: Option<String>,
    pub current_hash: Option<String>,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(path: impl Into<String>, kind: ChangeKind, timestamp_ms: u64) -> Self {
        Self {
            path: path.into(),
            kind,
            timestamp_ms,
            previous_hash: None,
            current_hash: None,
        }
    }
}

/// Pure merge of two events for the same path, oldest first.
///
/// `None` means the pair annihilates: a file created and deleted within
/// one window was never visible to the index.
#[must_use]
pub const fn coalesce(old: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::{Created, Deleted, Modified};
    match (old, new) {
        (Created, Created | Modified) => Some(Created),
        (Created, Deleted) => None,
        (Modified, Created | Modified) => Some(Modified),
        (Modified | Deleted, Deleted) => Some(Deleted),
        (Deleted, Created | Modified) => Some(Modified),
    }
}

struct PendingEntry {
    event: ChangeEvent,
    deadline: Instant,
    first_seen: Instant,
}

/// Debounce queue keyed by path.
///
/// Every new event for a path merges with the pending one and pushes the
/// quiet-window deadline out; `max_wait` from the first event bounds how
/// long a trickle can defer the flush. All timing goes through explicit
/// `Instant`s so behaviour is testable without sleeping.
pub struct PendingChanges {
    entries: HashMap<String, PendingEntry>,
    quiet_window: Duration,
    max_wait: Duration,
}

impl PendingChanges {
    #[must_use]
    pub fn new(quiet_window: Duration, max_wait: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            quiet_window,
            max_wait,
        }
    }

    pub fn record(&mut self, event: ChangeEvent) {
        self.record_at(event, Instant::now());
    }

    /// Merge `event` into the queue as of `now`. Never drops a pending
    /// event except by annihilation.
    pub fn record_at(&mut self, event: ChangeEvent, now: Instant) {
        let deadline = now + self.quiet_window;
        match self.entries.remove(&event.path) {
            None => {
                self.entries.insert(
                    event.path.clone(),
                    PendingEntry {
                        event,
                        deadline,
                        first_seen: now,
                    },
                );
            }
            Some(existing) => {
                let Some(kind) = coalesce(existing.event.kind, event.kind) else {
                    return;
                };
                let merged = ChangeEvent {
                    path: event.path.clone(),
                    kind,
                    timestamp_ms: event.timestamp_ms,
                    previous_hash: existing.event.previous_hash,
                    current_hash: event.current_hash,
                };
                self.entries.insert(
                    event.path,
                    PendingEntry {
                        event: merged,
                        deadline,
                        first_seen: existing.first_seen,
                    },
                );
            }
        }
    }

    /// Earliest instant at which some entry is due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .values()
            .map(|e| e.deadline.min(e.first_seen + self.max_wait))
            .min()
    }

    /// Take every event whose deadline has passed as of `now`, ordered by
    /// path for determinism.
    pub fn drain_due(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let max_wait = self.max_wait;
        let due: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| now >= e.deadline.min(e.first_seen + max_wait))
            .map(|(path, _)| path.clone())
            .collect();
        let mut events: Vec<ChangeEvent> = due
            .iter()
            .filter_map(|path| self.entries.remove(path))
            .map(|e| e.event)
            .collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    /// Take everything regardless of deadlines (forced flush).
    pub fn drain_all(&mut self) -> Vec<ChangeEvent> {
        let mut events: Vec<ChangeEvent> =
            self.entries.drain().map(|(_, e)| e.event).collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn coalesce_follows_the_merge_table() {
        use ChangeKind::{Created, Deleted, Modified};
        assert_eq!(coalesce(Created, Modified), Some(Created));
        assert_eq!(coalesce(Created, Deleted), None);
        assert_eq!(coalesce(Modified, Deleted), Some(Deleted));
        assert_eq!(coalesce(Deleted, Created), Some(Modified));
        assert_eq!(coalesce(Created, Created), Some(Created));
        assert_eq!(coalesce(Modified, Modified), Some(Modified));
        assert_eq!(coalesce(Deleted, Deleted), Some(Deleted));
        assert_eq!(coalesce(Modified, Created), Some(Modified));
        assert_eq!(coalesce(Deleted, Modified), Some(Modified));
    }

    #[test]
    fn create_then_delete_annihilates() {
        let mut pending = PendingChanges::new(Duration::from_secs(2), Duration::from_secs(10));
        let t0 = Instant::now();
        pending.record_at(ChangeEvent::new("a.rs", ChangeKind::Created, 1), t0);
        pending.record_at(ChangeEvent::new("a.rs", ChangeKind::Deleted, 2), t0);
        assert!(pending.is_empty());
    }

    #[test]
    fn new_event_reschedules_the_deadline() {
        let mut pending = PendingChanges::new(Duration::from_secs(2), Duration::from_secs(60));
        let t0 = Instant::now();
        pending.record_at(ChangeEvent::new("a.rs", ChangeKind::Modified, 1), t0);
        let first = pending.next_deadline().unwrap();

        let t1 = t0 + Duration::from_secs(1);
        pending.record_at(ChangeEvent::new("a.rs", ChangeKind::Modified, 2), t1);
        let second = pending.next_deadline().unwrap();
        assert!(second > first);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn max_wait_bounds_rescheduling() {
        let quiet = Duration::from_secs(2);
        let max_wait = Duration::from_secs(5);
        let mut pending = PendingChanges::new(quiet, max_wait);
        let t0 = Instant::now();
        pending.record_at(ChangeEvent::new("a.rs", ChangeKind::Modified, 0), t0);

        // A trickle of events every second keeps pushing the quiet window.
        for i in 1..=10 {
            let t = t0 + Duration::from_secs(i);
            pending.record_at(ChangeEvent::new("a.rs", ChangeKind::Modified, i), t);
        }
        // The flush deadline never moves past first_seen + max_wait.
        assert_eq!(pending.next_deadline().unwrap(), t0 + max_wait);
        assert_eq!(pending.drain_due(t0 + max_wait).len(), 1);
    }

    #[test]
    fn drain_due_takes_only_expired_entries() {
        let mut pending = PendingChanges::new(Duration::from_secs(2), Duration::from_secs(60));
        let t0 = Instant::now();
        pending.record_at(ChangeEvent::new("old.rs", ChangeKind::Modified, 1), t0);
        pending.record_at(
            ChangeEvent::new("fresh.rs", ChangeKind::Created, 2),
            t0 + Duration::from_secs(1),
        );

        let due = pending.drain_due(t0 + Duration::from_secs(2));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].path, "old.rs");
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn merge_keeps_oldest_previous_and_newest_current_hash() {
        let mut pending = PendingChanges::new(Duration::from_secs(2), Duration::from_secs(60));
        let t0 = Instant::now();
        let mut first = ChangeEvent::new("a.rs", ChangeKind::Modified, 1);
        first.previous_hash = Some("h0".into());
        first.current_hash = Some("h1".into());
        let mut second = ChangeEvent::new("a.rs", ChangeKind::Modified, 2);
        second.current_hash = Some("h2".into());

        pending.record_at(first, t0);
        pending.record_at(second, t0);
        let drained = pending.drain_all();
        assert_eq!(drained[0].previous_hash.as_deref(), Some("h0"));
        assert_eq!(drained[0].current_hash.as_deref(), Some("h2"));
        assert_eq!(drained[0].timestamp_ms, 2);
    }
}
