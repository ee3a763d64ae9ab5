//! Physical ↔ logical UID bijection, scoped per (SyncTarget, workspace) (§3, §9).
//!
//! Deliberately not safe for concurrent mutation by multiple workers on the
//! same mapping (§5): it is scoped per-reconcile-cycle, so no cross-worker
//! contention arises. Modelled as two flat tables rewritten in place (§9
//! "Cyclic references"), not a graph.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// A bijective mapping between physical and logical UIDs.
#[derive(Debug, Clone, Default)]
pub struct UidMapping {
    physical_to_logical: HashMap<String, String>,
    logical_to_physical: HashMap<String, String>,
}

impl UidMapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a `(physical, logical)` pair, updating both directions
    /// atomically. Fails if `physical` already maps to a *different*
    /// logical UID (§3 invariant: "no physicalUID maps to two distinct
    /// logicalUIDs"). Re-inserting the same pair is a no-op success.
    pub fn insert(&mut self, physical_uid: impl Into<String>, logical_uid: impl Into<String>) -> Result<()> {
        let physical_uid = physical_uid.into();
        let logical_uid = logical_uid.into();

        if let Some(existing) = self.physical_to_logical.get(&physical_uid) {
            if *existing != logical_uid {
                return Err(Error::UidConflict {
                    uid: physical_uid,
                    existing: existing.clone(),
                    attempted: logical_uid,
                });
            }
            return Ok(());
        }

        if let Some(existing) = self.logical_to_physical.get(&logical_uid) {
            if *existing != physical_uid {
                return Err(Error::UidConflict {
                    uid: logical_uid,
                    existing: existing.clone(),
                    attempted: physical_uid,
                });
            }
        }

        self.physical_to_logical.insert(physical_uid.clone(), logical_uid.clone());
        self.logical_to_physical.insert(logical_uid, physical_uid);
        Ok(())
    }

    /// Look up the logical UID for a physical one.
    pub fn logical_for(&self, physical_uid: &str) -> Option<&str> {
        self.physical_to_logical.get(physical_uid).map(String::as_str)
    }

    /// Look up the physical UID for a logical one.
    pub fn physical_for(&self, logical_uid: &str) -> Option<&str> {
        self.logical_to_physical.get(logical_uid).map(String::as_str)
    }

    /// Remove a mapping by physical UID, if present.
    pub fn remove_physical(&mut self, physical_uid: &str) {
        if let Some(logical) = self.physical_to_logical.remove(physical_uid) {
            self.logical_to_physical.remove(&logical);
        }
    }

    /// Number of mapped pairs.
    pub fn len(&self) -> usize {
        self.physical_to_logical.len()
    }

    /// True if the mapping holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
