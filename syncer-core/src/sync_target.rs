//! The `SyncTarget` entity (§3) and its condition set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tri-state condition status, as in upstream Kubernetes conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The condition could not be determined.
    Unknown,
}

/// A single named condition in `status.conditions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Condition name, e.g. `"Ready"`, `"SyncerReady"`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Current status.
    pub status: ConditionStatus,
    /// Short machine-readable reason, e.g. `SyncHealthy`.
    #[serde(default)]
    pub reason: String,
    /// Human-readable detail.
    #[serde(default)]
    pub message: String,
    /// When this condition was last updated.
    pub last_transition_time: DateTime<Utc>,
}

/// Declared sync target state (§3 "SyncTarget").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTargetSpec {
    /// Opaque placement/location hint for the downstream cluster.
    pub location: String,
    /// Resource-plural names this target will sync, optionally `.group`-qualified.
    /// Empty means "no declared restriction" (see [`SyncTargetSpec::supports`]).
    #[serde(default)]
    pub supported_resource_types: Vec<String>,
}

impl SyncTargetSpec {
    /// True if this target enumerates supported types and `qualified_resource`
    /// (either bare plural or `plural.group`) matches one of them.
    ///
    /// An empty `supported_resource_types` list is treated by callers as "no
    /// restriction declared"; this method only answers the matching question
    /// for a non-empty list. See [`crate::discovery::DiscoveryCache::syncable`].
    pub fn supports(&self, resource: &str, qualified_resource: &str) -> bool {
        self.supported_resource_types
            .iter()
            .any(|t| t == resource || t == qualified_resource)
    }
}

/// Observed sync target state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncTargetStatus {
    /// Named conditions, keyed by `type` for lookup convenience.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Last time a syncer heartbeat was observed.
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Last time a sync pass completed (successfully or not).
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl SyncTargetStatus {
    /// Look up a condition by type.
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Set (insert or replace) a condition.
    pub fn set_condition(&mut self, condition: Condition) {
        if let Some(existing) = self.conditions.iter_mut().find(|c| c.type_ == condition.type_) {
            *existing = condition;
        } else {
            self.conditions.push(condition);
        }
    }
}

/// A declaration that a downstream cluster participates in federation (§3).
///
/// Identity is `(logical_cluster, name)`; `uid` is a stable identifier that
/// survives renames of neither field (SyncTargets are not renamed in place).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTarget {
    /// Stable identifier, independent of name/logical_cluster.
    pub uid: String,
    /// Name, unique within `logical_cluster`.
    pub name: String,
    /// The logical cluster (workspace) this SyncTarget belongs to.
    pub logical_cluster: String,
    /// Declared spec.
    pub spec: SyncTargetSpec,
    /// Observed status.
    #[serde(default)]
    pub status: SyncTargetStatus,
}

impl SyncTarget {
    /// Stable queue/lookup key: `"<logicalCluster>/<name>"` (§4.7).
    pub fn key(&self) -> String {
        format!("{}/{}", self.logical_cluster, self.name)
    }

    /// *Ready* ⇔ condition `"Ready"` = `True` (§3).
    pub fn is_ready(&self) -> bool {
        matches!(
            self.status.condition("Ready").map(|c| c.status),
            Some(ConditionStatus::True)
        )
    }
}

/// Per-key extra bookkeeping a caller might attach (not part of the wire
/// shape); kept separate so `SyncTarget` itself stays a plain data record.
pub type AnnotationMap = BTreeMap<String, String>;
