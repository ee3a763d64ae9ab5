//! Per-SyncTarget discovery cache (§4.3).

use crate::gvr::{CacheEntry, DiscoveredResource, Gvr};
use crate::sync_target::SyncTarget;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-SyncTarget view of which resource kinds are syncable.
///
/// Entries carry an `expiresAt`; a hit refreshes `accessedAt` but never
/// `expiresAt` (§3 "DiscoveryCache entries"). Protected by a single-writer,
/// multi-reader lock per §5.
pub struct DiscoveryCache {
    entries: RwLock<HashMap<Gvr, CacheEntry>>,
    last_refresh: RwLock<Option<Instant>>,
    ttl: Duration,
}

impl DiscoveryCache {
    /// Build an empty cache with the given per-entry TTL (`defaultCacheTTL`, default 5 min).
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
            ttl,
        }
    }

    /// True if the cache has never been populated, or was populated more
    /// than `refresh_interval` ago.
    pub fn is_stale(&self, refresh_interval: Duration, now: Instant) -> bool {
        match *self.last_refresh.read() {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= refresh_interval,
        }
    }

    /// Repopulate the cache from a freshly-listed set of discovered
    /// resources, atomically, unless the last refresh is newer than
    /// `refresh_interval` (§4.3).
    ///
    /// `discovered` stands in for the external physical-client discovery
    /// call (§6); the cache itself does not know how to talk to a cluster.
    pub fn refresh_if_stale(&self, discovered: Vec<DiscoveredResource>, refresh_interval: Duration, now: Instant) -> bool {
        if !self.is_stale(refresh_interval, now) {
            return false;
        }
        let mut entries = self.entries.write();
        entries.clear();
        for resource in discovered {
            let gvr = resource.gvr.clone();
            entries.insert(gvr, CacheEntry::new(resource, self.ttl, now));
        }
        drop(entries);
        *self.last_refresh.write() = Some(now);
        true
    }

    /// Record a cache hit: bumps `accessedAt`, leaves `expiresAt` untouched.
    fn touch(&self, gvr: &Gvr, now: Instant) {
        if let Some(entry) = self.entries.write().get_mut(gvr) {
            entry.accessed_at = now;
        }
    }

    /// Syncable resources for this SyncTarget (§4.3): not expired, verbs
    /// include get/list/watch, and — if the SyncTarget enumerates supported
    /// types — matched by plural or `plural.group`.
    pub fn syncable(&self, sync_target: &SyncTarget, now: Instant) -> HashMap<Gvr, DiscoveredResource> {
        let mut out = HashMap::new();
        let gvrs: Vec<Gvr> = self.entries.read().keys().cloned().collect();
        for gvr in gvrs {
            let entry_snapshot = {
                let entries = self.entries.read();
                entries.get(&gvr).filter(|e| !e.is_expired(now)).map(|e| e.resource.clone())
            };
            let Some(resource) = entry_snapshot else { continue };
            if !resource.has_required_verbs() {
                continue;
            }
            if !sync_target.spec.supported_resource_types.is_empty()
                && !sync_target.spec.supports(&gvr.resource, &gvr.qualified_resource())
            {
                continue;
            }
            self.touch(&gvr, now);
            out.insert(gvr, resource);
        }
        out
    }

    /// Remove expired entries. Intended to be driven by a periodic sweeper
    /// task (§4.3, §SPEC_FULL.md "Discovery sweep task"), not just the
    /// lazy filtering in [`Self::syncable`].
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// Number of cached entries, expired or not. For tests/observability.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_target::{SyncTarget, SyncTargetSpec, SyncTargetStatus};

    fn target(types: &[&str]) -> SyncTarget {
        SyncTarget {
            uid: "uid".into(),
            name: "t".into(),
            logical_cluster: "root".into(),
            spec: SyncTargetSpec {
                location: "loc".into(),
                supported_resource_types: types.iter().map(|s| s.to_string()).collect(),
            },
            status: SyncTargetStatus::default(),
        }
    }

    fn pods_resource() -> DiscoveredResource {
        DiscoveredResource {
            gvr: Gvr::core("v1", "pods"),
            namespaced: true,
            verbs: vec!["get".into(), "list".into(), "watch".into(), "create".into()],
            kind: "Pod".into(),
            last_discovered: Instant::now(),
        }
    }

    #[test]
    fn refresh_then_syncable_filters_by_supported_types() {
        let cache = DiscoveryCache::new(Duration::from_secs(300));
        let now = Instant::now();
        assert!(cache.refresh_if_stale(vec![pods_resource()], Duration::from_secs(300), now));
        assert!(!cache.refresh_if_stale(vec![pods_resource()], Duration::from_secs(300), now));

        let t = target(&["pods"]);
        assert_eq!(cache.syncable(&t, now).len(), 1);

        let t2 = target(&["services"]);
        assert_eq!(cache.syncable(&t2, now).len(), 0);

        let t3 = target(&[]);
        assert_eq!(cache.syncable(&t3, now).len(), 1, "empty supported list means no restriction");
    }

    #[test]
    fn expired_entries_are_ignored_and_swept() {
        let cache = DiscoveryCache::new(Duration::from_millis(1));
        let now = Instant::now();
        cache.refresh_if_stale(vec![pods_resource()], Duration::from_secs(300), now);
        let later = now + Duration::from_secs(1);
        let t = target(&[]);
        assert_eq!(cache.syncable(&t, later).len(), 0);
        assert_eq!(cache.sweep_expired(later), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn verbs_without_watch_are_excluded() {
        let cache = DiscoveryCache::new(Duration::from_secs(300));
        let now = Instant::now();
        let mut r = pods_resource();
        r.verbs = vec!["get".into(), "list".into()];
        cache.refresh_if_stale(vec![r], Duration::from_secs(300), now);
        let t = target(&[]);
        assert_eq!(cache.syncable(&t, now).len(), 0);
    }
}
