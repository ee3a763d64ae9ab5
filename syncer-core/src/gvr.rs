//! Group-version-resource identity and discovery records (§3 "DiscoveredResource").

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// `(group, version, resource-plural)` triple identifying a resource kind,
/// mirroring `kube_core::discovery::ApiResource`'s essential fields.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Gvr {
    /// Resource group; empty for the core group.
    pub group: String,
    /// API version, e.g. `v1`.
    pub version: String,
    /// Plural resource name, e.g. `pods`.
    pub resource: String,
}

impl Gvr {
    /// Build a GVR.
    pub fn new(group: impl Into<String>, version: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// Core-group GVR, e.g. `Gvr::core("v1", "pods")`.
    pub fn core(version: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new("", version, resource)
    }

    /// `"<resource>.<group>"`, or bare `"<resource>"` for the core group.
    pub fn qualified_resource(&self) -> String {
        if self.group.is_empty() {
            self.resource.clone()
        } else {
            format!("{}.{}", self.resource, self.group)
        }
    }

    /// `apiVersion` string: `group/version`, or bare `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// A resource kind observed via discovery on a particular physical cluster
/// (§3 "DiscoveredResource").
#[derive(Debug, Clone)]
pub struct DiscoveredResource {
    /// The resource identity.
    pub gvr: Gvr,
    /// Whether the resource is namespace-scoped.
    pub namespaced: bool,
    /// Supported verbs, e.g. `["get", "list", "watch", "create", ...]`.
    pub verbs: Vec<String>,
    /// Singular PascalCase kind name, e.g. `Pod`.
    pub kind: String,
    /// When this record was last (re)discovered.
    pub last_discovered: Instant,
}

const REQUIRED_VERBS: [&str; 3] = ["get", "list", "watch"];

impl DiscoveredResource {
    /// Eligible for sync iff it supports get/list/watch (§3).
    pub fn has_required_verbs(&self) -> bool {
        REQUIRED_VERBS.iter().all(|v| self.verbs.iter().any(|have| have == v))
    }
}

/// A cache entry wrapping a [`DiscoveredResource`] with TTL bookkeeping
/// (§3 "DiscoveryCache entries").
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub resource: DiscoveredResource,
    pub expires_at: Instant,
    pub accessed_at: Instant,
}

impl CacheEntry {
    pub fn new(resource: DiscoveredResource, ttl: Duration, now: Instant) -> Self {
        Self {
            resource,
            expires_at: now + ttl,
            accessed_at: now,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
