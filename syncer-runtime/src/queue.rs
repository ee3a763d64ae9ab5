//! Rate-limited, single-flight-per-key work queue (§4.7, §9 "Work queue").
//!
//! Modelled per the redesign guidance: an unbounded set of pending items, a
//! concurrent set of in-flight keys, and a priority queue of
//! `(nextReadyAt, key)` for rate-limited retries — rather than porting
//! `kube_runtime::scheduler::Scheduler`'s `Stream`-combinator design
//! verbatim, since this queue is driven by worker `pop()` calls instead of
//! being consumed as a `Stream`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};

/// What a [`WorkItem`] asks the reconciler to do (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Full reconcile pass.
    Sync,
    /// Re-run reconciliation without a fresh discovery cycle.
    Reconcile,
    /// The SyncTarget was deleted.
    Delete,
}

/// A queue entry identifying a reconcile request for one SyncTarget key (§3).
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// `"<logicalCluster>/<name>"`.
    pub target_key: String,
    /// What to do.
    pub action: Action,
    /// When this item was first enqueued (not re-enqueued).
    pub enqueued_at: Instant,
    /// How many times this item has already been retried.
    pub retries: u32,
}

#[derive(Debug, Clone)]
struct Scheduled {
    run_at: Instant,
    seq: u64,
    key: String,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.run_at == other.run_at && self.seq == other.seq
    }
}
impl Eq for Scheduled {}
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the earliest `run_at` first.
        other.run_at.cmp(&self.run_at).then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Inner {
    heap: BinaryHeap<Scheduled>,
    /// Latest `run_at` scheduled for a key; used to discard stale heap
    /// entries left behind when a key is rescheduled earlier (lazy deletion).
    scheduled_for: HashMap<String, Instant>,
    items: HashMap<String, WorkItem>,
    /// Keys currently being processed by a worker (§5 "at most one worker at a time").
    processing: HashSet<String>,
    /// Keys whose scheduled time arrived while they were already processing;
    /// released back onto the heap by [`WorkQueue::done`].
    pending: HashSet<String>,
    seq: u64,
}

/// A thread-safe, rate-limited work queue with single-flight-per-key
/// processing semantics (§4.7, §5).
pub struct WorkQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    max_retries: u32,
}

impl WorkQueue {
    /// Build an empty queue. `max_retries` bounds [`WorkItem::retries`] (§3, default 5).
    pub fn new(max_retries: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                scheduled_for: HashMap::new(),
                items: HashMap::new(),
                processing: HashSet::new(),
                pending: HashSet::new(),
                seq: 0,
            }),
            notify: Notify::new(),
            max_retries,
        }
    }

    /// Enqueue `key` to run immediately (e.g. from an informer callback or
    /// the periodic ticker, §4.7).
    pub async fn add(&self, key: impl Into<String>, action: Action) {
        self.schedule(key.into(), action, Instant::now(), 0).await;
    }

    /// Re-enqueue `key` after a rate-limited backoff, bumping its retry
    /// count (§4.7 "Retry policy"). Returns `false` (and does not
    /// re-enqueue) once `retries` would exceed `max_retries` — the caller
    /// should Forget and increment its error counter instead (§3 WorkItem
    /// "Retries bounded by MaxRetries; dropped when exceeded").
    pub async fn add_rate_limited(&self, key: impl Into<String>, action: Action) -> bool {
        let key = key.into();
        let retries = {
            let inner = self.inner.lock().await;
            inner.items.get(&key).map(|i| i.retries).unwrap_or(0) + 1
        };
        if retries > self.max_retries {
            return false;
        }
        let delay = backoff_for(retries);
        self.schedule(key, action, Instant::now() + delay, retries).await;
        true
    }

    async fn schedule(&self, key: String, action: Action, run_at: Instant, retries: u32) {
        let mut inner = self.inner.lock().await;
        let seq = inner.seq;
        inner.seq += 1;

        let enqueued_at = inner.items.get(&key).map(|i| i.enqueued_at).unwrap_or(run_at);
        inner.items.insert(
            key.clone(),
            WorkItem {
                target_key: key.clone(),
                action,
                enqueued_at,
                retries,
            },
        );
        inner.scheduled_for.insert(key.clone(), run_at);
        inner.heap.push(Scheduled { run_at, seq, key });
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Take the next ready item, blocking the caller until one is available.
    /// Guarantees at most one concurrent holder per key (§5).
    pub async fn pop(&self) -> WorkItem {
        loop {
            let wait = {
                let mut inner = self.inner.lock().await;
                match self.try_take_ready(&mut inner) {
                    Ok(item) => return item,
                    Err(wait) => wait,
                }
            };
            match wait {
                Some(duration) => {
                    let _ = tokio::time::timeout(duration, self.notify.notified()).await;
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Returns `Ok(item)` if one could be taken, or `Err(wait_hint)` — `None`
    /// meaning "nothing scheduled, wait for a notification", `Some(d)`
    /// meaning "the earliest pending item is `d` away".
    fn try_take_ready(&self, inner: &mut Inner) -> Result<WorkItem, Option<Duration>> {
        let now = Instant::now();
        loop {
            let Some(top) = inner.heap.peek() else {
                return Err(None);
            };
            // Discard stale entries superseded by a later `schedule` call.
            if inner.scheduled_for.get(&top.key) != Some(&top.run_at) {
                inner.heap.pop();
                continue;
            }
            if top.run_at > now {
                return Err(Some(top.run_at - now));
            }
            if inner.processing.contains(&top.key) {
                // Already being worked; park it until `done()` releases it.
                let Scheduled { key, .. } = inner.heap.pop().unwrap();
                inner.pending.insert(key);
                continue;
            }
            let Scheduled { key, .. } = inner.heap.pop().unwrap();
            inner.scheduled_for.remove(&key);
            inner.processing.insert(key.clone());
            let item = inner.items.get(&key).cloned().expect("item metadata missing for scheduled key");
            return Ok(item);
        }
    }

    /// Mark `key` as no longer being processed. If it was `pending` (its
    /// time arrived while a worker held it), re-schedule it immediately.
    pub async fn done(&self, key: &str) {
        let mut inner = self.inner.lock().await;
        inner.processing.remove(key);
        if inner.pending.remove(key) {
            let seq = inner.seq;
            inner.seq += 1;
            let run_at = Instant::now();
            inner.scheduled_for.insert(key.to_string(), run_at);
            inner.heap.push(Scheduled {
                run_at,
                seq,
                key: key.to_string(),
            });
            drop(inner);
            self.notify.notify_waiters();
        }
    }

    /// Forget `key` entirely: drops its retry count and metadata. Called on
    /// successful processing, or once `MaxRetries` is exhausted (§4.7).
    pub async fn forget(&self, key: &str) {
        let mut inner = self.inner.lock().await;
        inner.items.remove(key);
        inner.processing.remove(key);
        inner.pending.remove(key);
    }

    /// Number of distinct keys known to the queue (scheduled or processing).
    pub async fn len(&self) -> usize {
        self.inner.lock().await.items.len()
    }
}

/// Exponential backoff, doubling from 5ms, capped at 1000s — matches the
/// shape of `client-go`'s default rate limiter closely enough for this
/// engine's purposes; the exact curve is an Open Question (§9) the spec
/// leaves unguessed, so only the bound (grows with retries, capped) is load-bearing.
fn backoff_for(retries: u32) -> Duration {
    let base_ms = 5u64.saturating_mul(1u64 << retries.min(20));
    Duration::from_millis(base_ms.min(1000 * 1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_returns_immediately_enqueued_items() {
        let q = WorkQueue::new(5);
        q.add("a", Action::Sync).await;
        let item = q.pop().await;
        assert_eq!(item.target_key, "a");
        assert_eq!(item.retries, 0);
    }

    #[tokio::test]
    async fn at_most_one_worker_per_key() {
        let q = WorkQueue::new(5);
        q.add("a", Action::Sync).await;
        let first = q.pop().await;
        assert_eq!(first.target_key, "a");

        // Re-enqueuing the same key while it's being processed must not hand
        // out a second concurrent copy.
        q.add("a", Action::Sync).await;
        let popped_again = tokio::time::timeout(Duration::from_millis(50), q.pop()).await;
        assert!(popped_again.is_err(), "second worker should not receive key still in flight");

        q.done("a").await;
        let second = tokio::time::timeout(Duration::from_millis(200), q.pop()).await.unwrap();
        assert_eq!(second.target_key, "a");
    }

    #[tokio::test]
    async fn add_rate_limited_respects_max_retries() {
        let q = WorkQueue::new(2);
        assert!(q.add_rate_limited("a", Action::Sync).await);
        assert!(q.add_rate_limited("a", Action::Sync).await);
        assert!(!q.add_rate_limited("a", Action::Sync).await, "3rd retry exceeds MaxRetries=2");
    }

    #[tokio::test]
    async fn forget_resets_retry_count() {
        let q = WorkQueue::new(2);
        assert!(q.add_rate_limited("a", Action::Sync).await);
        q.forget("a").await;
        assert!(q.add_rate_limited("a", Action::Sync).await);
    }
}
