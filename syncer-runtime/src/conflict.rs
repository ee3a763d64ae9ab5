//! Multi-source conflict detection and resolution (§4.4).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use syncer_core::object::Object;
use syncer_core::transform::kinds::Kind;

/// What kind of disagreement was detected, in the order §4.4 checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    /// `metadata.generation` differs.
    Generation,
    /// `spec` differs (deep inequality).
    Status,
    /// A critical annotation differs.
    Metadata,
    /// A critical label differs.
    Content,
}

/// How urgently a conflict needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Cosmetic; safe to auto-resolve.
    Low,
    /// Notable; still safe to auto-resolve.
    Medium,
    /// Requires a human or an explicit policy; never auto-resolved.
    High,
}

/// A detected disagreement between two candidate observations of the same
/// logical key.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// `"<namespace>/<name>"` of the logical object in question.
    pub resource_key: String,
    /// The two candidates that disagree: `(physical, logical)`.
    pub statuses: (Object, Object),
    /// What kind of disagreement this is.
    pub conflict_type: ConflictType,
    /// How urgent.
    pub severity: Severity,
}

/// The strategy used to resolve a [`Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Copy logical; overwrite `status` with physical.
    ServerSide,
    /// Copy physical; re-apply engine-owned annotations from logical.
    ClientSide,
    /// Copy physical; merge engine-owned annotations; replace `spec` with
    /// logical `spec` for workload controllers.
    ThreeWayMerge,
    /// Whichever candidate has the later creation timestamp.
    LastWriteWins,
    /// Never auto-resolved; requires external intervention.
    Manual,
}

/// The outcome of resolving a [`Conflict`].
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The conflict this resolves.
    pub conflict: Conflict,
    /// The object chosen/merged as the resolved value.
    pub resolved: Object,
    /// The strategy that was applied.
    pub strategy: Strategy,
    /// When the resolution happened.
    pub timestamp: DateTime<Utc>,
}

/// Annotations whose disagreement counts as a conflict (§4.4 step 3).
const CRITICAL_ANNOTATIONS: &[&str] = &[
    "deployment.kubernetes.io/revision",
    "kubectl.kubernetes.io/last-applied-configuration",
];
/// Labels whose disagreement counts as a conflict (§4.4 step 4).
const CRITICAL_LABELS: &[&str] = &["app", "version", "component"];

/// Per-kind strategy table, overridable at construction (§4.4).
fn default_strategy_for(kind: Kind) -> Strategy {
    match kind {
        Kind::Pod => Strategy::ClientSide,
        Kind::ConfigMap | Kind::Secret => Strategy::ServerSide,
        Kind::Service | Kind::Deployment | Kind::StatefulSet | Kind::DaemonSet => Strategy::ThreeWayMerge,
        Kind::Node | Kind::PersistentVolume | Kind::Generic => Strategy::ThreeWayMerge,
    }
}

/// Decides between candidate values when multiple downstream observations
/// of one logical key disagree, and keeps a bounded history of the
/// outcomes (§4.4).
pub struct ConflictResolver {
    overrides: BTreeMap<String, Strategy>,
    history: Mutex<VecDeque<Resolution>>,
    history_cap: usize,
}

impl ConflictResolver {
    /// Build a resolver with the default per-kind strategy table and the
    /// given conflict-history ring-buffer bound (`conflictHistorySize`, default 100).
    pub fn new(history_cap: usize) -> Self {
        Self {
            overrides: BTreeMap::new(),
            history: Mutex::new(VecDeque::with_capacity(history_cap.min(1024))),
            history_cap,
        }
    }

    /// Override the strategy used for a specific `kind` (by its `Kind` name, e.g. `"Pod"`).
    pub fn with_override(mut self, kind: impl Into<String>, strategy: Strategy) -> Self {
        self.overrides.insert(kind.into(), strategy);
        self
    }

    fn strategy_for(&self, kind_name: &str, kind: Kind) -> Strategy {
        self.overrides.get(kind_name).copied().unwrap_or_else(|| default_strategy_for(kind))
    }

    /// Detect whether `physical` and `logical` disagree, in the order §4.4
    /// specifies. Returns `None` if they don't conflict.
    pub fn detect(&self, resource_key: &str, physical: &Object, logical: &Object) -> Option<Conflict> {
        let conflict_type = if physical.metadata.generation != logical.metadata.generation {
            ConflictType::Generation
        } else if physical.spec != logical.spec {
            ConflictType::Status
        } else if CRITICAL_ANNOTATIONS
            .iter()
            .any(|k| physical.annotations().get(*k) != logical.annotations().get(*k))
        {
            ConflictType::Metadata
        } else if CRITICAL_LABELS.iter().any(|k| physical.labels().get(*k) != logical.labels().get(*k)) {
            ConflictType::Content
        } else {
            return None;
        };

        let severity = match conflict_type {
            ConflictType::Generation => Severity::Medium,
            ConflictType::Status => Severity::High,
            ConflictType::Metadata => Severity::Low,
            ConflictType::Content => Severity::Low,
        };

        Some(Conflict {
            resource_key: resource_key.to_string(),
            statuses: (physical.clone(), logical.clone()),
            conflict_type,
            severity,
        })
    }

    /// A conflict can be auto-resolved iff it isn't `High` severity, there's
    /// at least one candidate, and the chosen strategy isn't `Manual` (§4.4).
    pub fn can_auto_resolve(&self, conflict: &Conflict, strategy: Strategy) -> bool {
        conflict.severity != Severity::High && strategy != Strategy::Manual
    }

    /// Resolve `physical` vs `logical` for `resource_key`. Returns `physical`
    /// as-is with no recorded conflict if they don't disagree (§4.4 "No
    /// conflict ⇒ return physical as-is").
    pub fn resolve(&self, resource_key: &str, physical: &Object, logical: &Object) -> Object {
        let Some(conflict) = self.detect(resource_key, physical, logical) else {
            return physical.clone();
        };

        let kind = Kind::classify(physical.kind());
        let strategy = self.strategy_for(physical.kind(), kind);
        let resolved = apply_strategy(strategy, physical, logical, kind);

        self.record(Resolution {
            conflict,
            resolved: resolved.clone(),
            strategy,
            timestamp: Utc::now(),
        });

        resolved
    }

    fn record(&self, resolution: Resolution) {
        let mut history = self.history.lock();
        if history.len() >= self.history_cap {
            history.pop_front();
        }
        history.push_back(resolution);
    }

    /// The `n` most recent resolutions, newest last.
    pub fn recent(&self, n: usize) -> Vec<Resolution> {
        let history = self.history.lock();
        history.iter().rev().take(n).rev().cloned().collect()
    }
}

impl Clone for Resolution {
    fn clone(&self) -> Self {
        Resolution {
            conflict: self.conflict.clone(),
            resolved: self.resolved.clone(),
            strategy: self.strategy,
            timestamp: self.timestamp,
        }
    }
}

fn apply_strategy(strategy: Strategy, physical: &Object, logical: &Object, kind: Kind) -> Object {
    match strategy {
        Strategy::ServerSide => {
            let mut out = logical.clone();
            out.status = physical.status.clone();
            out
        }
        Strategy::ClientSide => {
            let mut out = physical.clone();
            if let Some(annotations) = logical.metadata.annotations.clone() {
                let engine_owned: BTreeMap<_, _> = annotations
                    .into_iter()
                    .filter(|(k, _)| k.starts_with(syncer_core::transform::annotation_keys::ENGINE_PREFIX))
                    .collect();
                out.annotations_mut().extend(engine_owned);
            }
            out
        }
        Strategy::ThreeWayMerge => {
            let mut out = physical.clone();
            if let Some(annotations) = logical.metadata.annotations.clone() {
                let engine_owned: BTreeMap<_, _> = annotations
                    .into_iter()
                    .filter(|(k, _)| k.starts_with(syncer_core::transform::annotation_keys::ENGINE_PREFIX))
                    .collect();
                out.annotations_mut().extend(engine_owned);
            }
            if kind.is_workload_controller() {
                out.spec = logical.spec.clone();
            }
            out
        }
        Strategy::LastWriteWins => {
            let physical_ts = physical.metadata.creation_timestamp.as_ref().map(|t| t.0);
            let logical_ts = logical.metadata.creation_timestamp.as_ref().map(|t| t.0);
            let physical_newer = physical_ts >= logical_ts;
            if physical_newer {
                apply_strategy(Strategy::ClientSide, physical, logical, kind)
            } else {
                apply_strategy(Strategy::ServerSide, physical, logical, kind)
            }
        }
        Strategy::Manual => physical.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncer_core::object::Object;

    fn obj(kind: &str, generation: i64) -> Object {
        let mut o = Object::new("v1", kind, "x");
        o.metadata.generation = Some(generation);
        o
    }

    #[test]
    fn no_conflict_returns_physical_as_is() {
        let cr = ConflictResolver::new(100);
        let p = obj("Pod", 1);
        let l = p.clone();
        assert_eq!(cr.resolve("ns/x", &p, &l), p);
        assert_eq!(cr.recent(10).len(), 0);
    }

    #[test]
    fn generation_mismatch_is_detected_and_recorded() {
        let cr = ConflictResolver::new(100);
        let p = obj("Pod", 2);
        let l = obj("Pod", 1);
        let resolved = cr.resolve("ns/x", &p, &l);
        assert_eq!(resolved, p, "Pod strategy is ClientSide: physical wins");
        assert_eq!(cr.recent(10).len(), 1);
    }

    #[test]
    fn high_severity_cannot_auto_resolve() {
        let cr = ConflictResolver::new(100);
        let mut p = obj("Deployment", 1);
        p.spec = serde_json::json!({"replicas": 3});
        let mut l = obj("Deployment", 1);
        l.spec = serde_json::json!({"replicas": 5});
        let conflict = cr.detect("ns/x", &p, &l).unwrap();
        assert_eq!(conflict.severity, Severity::High);
        assert!(!cr.can_auto_resolve(&conflict, Strategy::ThreeWayMerge));
    }

    #[test]
    fn history_is_bounded() {
        let cr = ConflictResolver::new(2);
        for i in 0..5 {
            let p = obj("Pod", i + 1);
            let l = obj("Pod", i);
            cr.resolve("ns/x", &p, &l);
        }
        assert_eq!(cr.recent(10).len(), 2);
    }

    #[test]
    fn configmap_and_secret_use_server_side() {
        let cr = ConflictResolver::new(100);
        for kind in ["ConfigMap", "Secret"] {
            let mut p = obj(kind, 2);
            p.status = serde_json::json!({"observed": true});
            let l = obj(kind, 1);
            let resolved = cr.resolve("ns/x", &p, &l);
            assert_eq!(resolved.spec, l.spec, "{kind}: ServerSide copies logical spec");
            assert_eq!(resolved.status, p.status, "{kind}: ServerSide keeps physical status");
        }
    }

    #[test]
    fn workload_controller_three_way_merge_takes_logical_spec() {
        let cr = ConflictResolver::new(100);
        let mut p = obj("Deployment", 2);
        p.spec = serde_json::json!({"replicas": 3});
        let mut l = obj("Deployment", 1);
        l.spec = serde_json::json!({"replicas": 5});
        let resolved = cr.resolve("ns/x", &p, &l);
        assert_eq!(resolved.spec, l.spec);
    }
}
