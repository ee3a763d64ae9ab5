//! Reversible mapping between physical and logical namespaces (§4.1).

use crate::error::{Error, Result};

const PREFIX: &str = "kcp";

/// Well-known physical namespaces that get a dedicated logical suffix,
/// in the order §4.1 lists them.
const SPECIAL: &[(&str, &str)] = &[
    ("default", "default"),
    ("kube-system", "system-system"),
    ("kube-public", "system-public"),
    ("kube-node-lease", "system-node-lease"),
];

/// Deterministically maps physical namespaces to workspace-unique logical
/// namespaces and back, scoped by SyncTarget name.
///
/// Stateless: every method takes the `syncTargetName` it operates under, so
/// one value (or none at all — the type carries no fields) serves every
/// SyncTarget.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceMapper;

impl NamespaceMapper {
    /// Construct a mapper. Stateless, provided for symmetry with
    /// [`crate::transform::ResourceTransformer::new`].
    pub fn new() -> Self {
        Self
    }

    /// Map a physical namespace to its logical counterpart.
    ///
    /// Cluster-scoped objects (empty namespace) pass through unchanged.
    pub fn to_logical(&self, physical: &str, sync_target_name: &str) -> String {
        if physical.is_empty() {
            return String::new();
        }
        for (phys, suffix) in SPECIAL {
            if *phys == physical {
                return format!("{PREFIX}-{sync_target_name}-{suffix}");
            }
        }
        format!("{PREFIX}-{sync_target_name}-{physical}")
    }

    /// Exact inverse of [`Self::to_logical`].
    ///
    /// Cluster-scoped objects (empty namespace) pass through unchanged.
    pub fn to_physical(&self, logical: &str, sync_target_name: &str) -> Result<String> {
        if logical.is_empty() {
            return Ok(String::new());
        }
        let full_prefix = format!("{PREFIX}-{sync_target_name}-");
        let rest = logical
            .strip_prefix(&full_prefix)
            .ok_or_else(|| Error::NotLogicalNamespace {
                namespace: logical.to_string(),
                sync_target: sync_target_name.to_string(),
            })?;
        if rest.is_empty() {
            return Err(Error::NotLogicalNamespace {
                namespace: logical.to_string(),
                sync_target: sync_target_name.to_string(),
            });
        }
        for (phys, suffix) in SPECIAL {
            if *suffix == rest {
                return Ok((*phys).to_string());
            }
        }
        Ok(rest.to_string())
    }

    /// True iff [`Self::to_physical`] would succeed for `s`.
    pub fn is_logical(&self, s: &str, sync_target_name: &str) -> bool {
        self.to_physical(s, sync_target_name).is_ok()
    }

    /// Validate a namespace name: non-empty, ≤253 chars, RFC-1123 label shape.
    pub fn validate(&self, ns: &str) -> Result<()> {
        if ns.is_empty() || ns.len() > 253 {
            return Err(Error::InvalidNamespace(ns.to_string()));
        }
        if !is_rfc1123_label(ns) {
            return Err(Error::InvalidNamespace(ns.to_string()));
        }
        Ok(())
    }
}

/// `[a-z0-9]([-a-z0-9]*[a-z0-9])?` without pulling in a regex dependency for
/// a single fixed pattern.
fn is_rfc1123_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    let is_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) if is_alnum(first) && is_alnum(last) => {
            bytes.iter().all(|&b| is_alnum(b) || b == b'-')
        }
        _ => false,
    }
}
