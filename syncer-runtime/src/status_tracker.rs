//! Per-SyncTarget in-memory status bookkeeping (§4.7 "Per-SyncTarget status
//! tracking").

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A point-in-time snapshot of one SyncTarget's processing history.
/// Returned by value so readers never race with a worker mutating the
/// tracker (§4.7 "copies are returned to avoid racing with the worker").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetStatus {
    /// Total successful reconcile passes.
    pub sync_count: u64,
    /// Total failed reconcile passes.
    pub error_count: u64,
    /// When the most recent error occurred, if any.
    pub last_error_time: Option<DateTime<Utc>>,
    /// When the most recent successful pass completed, if any.
    pub last_sync: Option<DateTime<Utc>>,
}

/// Tracks [`TargetStatus`] per SyncTarget key (`"<logicalCluster>/<name>"`).
pub struct StatusTracker {
    entries: RwLock<HashMap<String, TargetStatus>>,
}

impl StatusTracker {
    /// Build an empty tracker.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record a successful reconcile pass for `key` at `at`.
    pub fn record_success(&self, key: &str, at: DateTime<Utc>) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.to_string()).or_default();
        entry.sync_count += 1;
        entry.last_sync = Some(at);
    }

    /// Record a failed reconcile pass for `key` at `at`.
    pub fn record_error(&self, key: &str, at: DateTime<Utc>) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.to_string()).or_default();
        entry.error_count += 1;
        entry.last_error_time = Some(at);
    }

    /// A copy of the current status for `key`, defaulting to all-zero if
    /// the key has never been processed.
    pub fn get(&self, key: &str) -> TargetStatus {
        self.entries.read().get(key).cloned().unwrap_or_default()
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_returns_zeroed_status() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.get("root/a"), TargetStatus::default());
    }

    #[test]
    fn success_and_error_accumulate_independently() {
        let tracker = StatusTracker::new();
        let t1 = Utc::now();
        tracker.record_success("root/a", t1);
        tracker.record_error("root/a", t1);
        tracker.record_success("root/a", t1);

        let status = tracker.get("root/a");
        assert_eq!(status.sync_count, 2);
        assert_eq!(status.error_count, 1);
        assert_eq!(status.last_sync, Some(t1));
        assert_eq!(status.last_error_time, Some(t1));
    }
}
