//! Per-`(syncerID, workspace)` [`ResourceTransformer`] cache (§4.8 "Per-
//! (syncerID, workspace) ResourceTransformer instances are cached via a
//! concurrent map and created on demand").

use dashmap::DashMap;
use std::sync::Arc;
use syncer_core::transform::ResourceTransformer;

/// Creates and caches one [`ResourceTransformer`] per `(syncerID, workspace)` pair.
pub struct TransformerCache {
    entries: DashMap<(String, String), Arc<ResourceTransformer>>,
}

impl TransformerCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Return the cached transformer for `(syncer_id, workspace)`, building
    /// one with `sync_target_uid` if absent.
    pub fn get_or_create(&self, syncer_id: &str, workspace: &str, sync_target_uid: &str) -> Arc<ResourceTransformer> {
        if let Some(existing) = self.entries.get(&(syncer_id.to_string(), workspace.to_string())) {
            return Arc::clone(&existing);
        }
        Arc::clone(
            self.entries
                .entry((syncer_id.to_string(), workspace.to_string()))
                .or_insert_with(|| Arc::new(ResourceTransformer::new(workspace, syncer_id, sync_target_uid))),
        )
    }

    /// Drop the cached transformer for `(syncer_id, workspace)`, if any.
    pub fn evict(&self, syncer_id: &str, workspace: &str) {
        self.entries.remove(&(syncer_id.to_string(), workspace.to_string()));
    }
}

impl Default for TransformerCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_return_the_same_transformer() {
        let cache = TransformerCache::new();
        let a = cache.get_or_create("agent-1", "root:ws", "uid-1");
        let b = cache.get_or_create("agent-1", "root:ws", "uid-1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_keys_get_distinct_transformers() {
        let cache = TransformerCache::new();
        let a = cache.get_or_create("agent-1", "root:ws", "uid-1");
        let b = cache.get_or_create("agent-2", "root:ws", "uid-2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn evict_forces_a_fresh_instance() {
        let cache = TransformerCache::new();
        let a = cache.get_or_create("agent-1", "root:ws", "uid-1");
        cache.evict("agent-1", "root:ws");
        let b = cache.get_or_create("agent-1", "root:ws", "uid-1");
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
