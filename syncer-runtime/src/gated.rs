//! Real/no-op pairs for the two feature-gated capabilities (§6 "Feature
//! gates", §9 "Feature-gated polymorphism").
//!
//! `upstreamSyncConflictResolution` and `upstreamSyncAggregation` each pick
//! between a real implementation and a no-op at construction time, selected
//! once from [`FeatureGates`] by [`build_conflict_resolving`]/
//! [`build_aggregating`]. Callers hold a `Box<dyn Trait>` afterwards and
//! never branch on the gate again.

use crate::aggregator::{AggregatedStatus, ResourceStatus, StatusAggregator};
use crate::conflict::{ConflictResolver, Resolution};
use syncer_core::error::{Error, Result};
use syncer_core::feature_gate::{FeatureGates, Gated};
use syncer_core::object::Object;

/// Conflict resolution behind a feature gate. The real path always
/// succeeds (`ConflictResolver::resolve` has no failure mode); the no-op
/// path has none either, since "take physical as-is" is a sensible
/// fallback, unlike aggregation's empty-input case (§7).
pub trait ConflictResolving: Send + Sync {
    /// Resolve `physical` vs `logical` for `resource_key`.
    fn resolve(&self, resource_key: &str, physical: &Object, logical: &Object) -> Object;

    /// The `n` most recent resolutions. Empty for the no-op path, since no
    /// conflicts are ever detected there.
    fn recent(&self, n: usize) -> Vec<Resolution>;
}

impl ConflictResolving for ConflictResolver {
    fn resolve(&self, resource_key: &str, physical: &Object, logical: &Object) -> Object {
        ConflictResolver::resolve(self, resource_key, physical, logical)
    }

    fn recent(&self, n: usize) -> Vec<Resolution> {
        ConflictResolver::recent(self, n)
    }
}

impl Gated for ConflictResolver {
    fn is_ready(&self) -> bool {
        true
    }
}

/// Disabled `upstreamSyncConflictResolution`: physical always wins, no
/// history is kept (§7 "conflict resolution disabled ⇒ always take
/// physical as-is").
pub struct NoopConflictResolver;

impl ConflictResolving for NoopConflictResolver {
    fn resolve(&self, _resource_key: &str, physical: &Object, _logical: &Object) -> Object {
        physical.clone()
    }

    fn recent(&self, _n: usize) -> Vec<Resolution> {
        Vec::new()
    }
}

impl Gated for NoopConflictResolver {
    fn is_ready(&self) -> bool {
        false
    }
}

/// Build the conflict-resolution capability for `gates`.
pub fn build_conflict_resolving(gates: FeatureGates, history_size: usize) -> Box<dyn ConflictResolving> {
    if gates.upstream_sync_conflict_resolution {
        Box::new(ConflictResolver::new(history_size))
    } else {
        Box::new(NoopConflictResolver)
    }
}

/// Status aggregation behind a feature gate. Unlike conflict resolution,
/// there's no sensible no-op result for "merge N observations into one" —
/// the no-op path reports [`Error::Disabled`] instead (§7 "Resolve returns
/// a ResolverDisabled error").
pub trait Aggregating: Send + Sync {
    /// Merge `resources` for one logical key, or fail if this capability is disabled.
    fn aggregate(&self, resource_key: &str, resources: &[ResourceStatus]) -> Result<AggregatedStatus>;
}

impl Aggregating for StatusAggregator {
    fn aggregate(&self, resource_key: &str, resources: &[ResourceStatus]) -> Result<AggregatedStatus> {
        StatusAggregator::aggregate(self, resource_key, resources)
    }
}

impl Gated for StatusAggregator {
    fn is_ready(&self) -> bool {
        true
    }
}

/// Disabled `upstreamSyncAggregation`.
pub struct NoopAggregator;

impl Aggregating for NoopAggregator {
    fn aggregate(&self, _resource_key: &str, _resources: &[ResourceStatus]) -> Result<AggregatedStatus> {
        Err(Error::Disabled("StatusAggregator"))
    }
}

impl Gated for NoopAggregator {
    fn is_ready(&self) -> bool {
        false
    }
}

/// Build the aggregation capability for `gates`.
pub fn build_aggregating(gates: FeatureGates, history_size: usize) -> Box<dyn Aggregating> {
    if gates.upstream_sync_aggregation {
        Box::new(StatusAggregator::new(ConflictResolver::new(history_size)))
    } else {
        Box::new(NoopAggregator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(kind: &str) -> Object {
        Object::new("v1", kind, "x")
    }

    #[test]
    fn enabled_gate_builds_real_conflict_resolver() {
        let resolver = build_conflict_resolving(FeatureGates::all_enabled(), 100);
        assert!(resolver.is_ready());
    }

    #[test]
    fn disabled_gate_builds_noop_conflict_resolver_taking_physical() {
        let resolver = build_conflict_resolving(FeatureGates::all_disabled(), 100);
        assert!(!resolver.is_ready());
        let physical = obj("Pod");
        let mut logical = physical.clone();
        logical.metadata.generation = Some(99);
        assert_eq!(resolver.resolve("ns/x", &physical, &logical), physical);
    }

    #[test]
    fn disabled_gate_builds_noop_aggregator_returning_disabled_error() {
        let aggregator = build_aggregating(FeatureGates::all_disabled(), 100);
        assert!(!aggregator.is_ready());
        let err = aggregator.aggregate("ns/x", &[]).unwrap_err();
        assert!(matches!(err, Error::Disabled("StatusAggregator")));
    }

    #[test]
    fn enabled_gate_builds_real_aggregator() {
        let aggregator = build_aggregating(FeatureGates::all_enabled(), 100);
        assert!(aggregator.is_ready());
        let resources = vec![ResourceStatus {
            cluster_name: "c1".to_string(),
            object: obj("ConfigMap"),
            last_updated: chrono::Utc::now(),
            health: syncer_core::health::Health::Healthy,
        }];
        assert!(aggregator.aggregate("ns/x", &resources).is_ok());
    }
}
