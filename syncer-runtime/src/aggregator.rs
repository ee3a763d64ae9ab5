//! Multi-source status aggregation and health determination (§4.5).

use crate::conflict::ConflictResolver;
use chrono::{DateTime, Utc};
use syncer_core::error::{Error, Result};
use syncer_core::gvr::Gvr;
use syncer_core::health::Health;
use syncer_core::object::Object;
use syncer_core::transform::kinds::Kind;

/// A single cluster's observation of a logical object (§3 "ResourceStatus").
#[derive(Debug, Clone)]
pub struct ResourceStatus {
    /// Which downstream cluster this observation came from.
    pub cluster_name: String,
    /// The observed object.
    pub object: Object,
    /// When this observation was taken.
    pub last_updated: DateTime<Utc>,
    /// This observation's own health classification.
    pub health: Health,
}

/// The result of merging several [`ResourceStatus`] entries for one logical key (§3).
#[derive(Debug, Clone)]
pub struct AggregatedStatus {
    /// `"<namespace>/<name>"` of the logical object.
    pub resource_key: String,
    /// The merged object.
    pub combined_object: Object,
    /// The inputs, in the order they were passed in.
    pub source_statuses: Vec<ResourceStatus>,
    /// When the aggregation ran.
    pub aggregation_time: DateTime<Utc>,
    /// `len(sourceStatuses) - 1` under the default strategy (§3 invariant).
    pub conflicts_resolved: usize,
}

/// Combines per-cluster `ResourceStatus` records into one `AggregatedStatus`,
/// delegating disagreements to a [`ConflictResolver`], and classifies
/// roll-up health (§4.5).
pub struct StatusAggregator {
    resolver: ConflictResolver,
}

impl StatusAggregator {
    /// Build an aggregator backed by the given conflict resolver.
    pub fn new(resolver: ConflictResolver) -> Self {
        Self { resolver }
    }

    /// Merge `resources` for one logical key (§4.5).
    ///
    /// Default rule: select the element with the maximum `last_updated`,
    /// breaking ties by stable cluster-name order (lexicographic). When
    /// more than one distinct strategy would apply across the pairwise
    /// merges (i.e. more than one non-selected candidate), each is merged
    /// pairwise against the selection via the [`ConflictResolver`].
    pub fn aggregate(&self, resource_key: &str, resources: &[ResourceStatus]) -> Result<AggregatedStatus> {
        if resources.is_empty() {
            return Err(Error::EmptyInput);
        }

        let selected_idx = resources
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.last_updated
                    .cmp(&b.last_updated)
                    .then_with(|| b.cluster_name.cmp(&a.cluster_name))
            })
            .map(|(i, _)| i)
            .expect("non-empty checked above");

        let mut combined = resources[selected_idx].object.clone();
        for (i, candidate) in resources.iter().enumerate() {
            if i == selected_idx {
                continue;
            }
            combined = self.resolver.resolve(resource_key, &combined, &candidate.object);
        }

        Ok(AggregatedStatus {
            resource_key: resource_key.to_string(),
            combined_object: combined,
            source_statuses: resources.to_vec(),
            aggregation_time: Utc::now(),
            conflicts_resolved: resources.len() - 1,
        })
    }

    /// Classify the health of a single observed object (§4.5 `determineHealth`).
    pub fn determine_health(&self, obj: &Object, gvr: &Gvr) -> Health {
        let kind = Kind::classify(obj.kind());
        let _ = gvr; // kind classification alone is sufficient for the rules below
        match kind {
            Kind::Pod => pod_health(obj),
            Kind::Deployment | Kind::StatefulSet => workload_health(obj),
            Kind::Service => Health::Healthy,
            _ => generic_health(obj),
        }
    }

    /// Roll up a list of per-cluster healths into one overall verdict (§4.5, §8).
    pub fn rollup(&self, healths: impl IntoIterator<Item = Health>) -> Health {
        Health::rollup(healths)
    }
}

fn pod_health(obj: &Object) -> Health {
    let phase = obj.status.get("phase").and_then(|v| v.as_str()).unwrap_or("");
    match phase {
        "Running" => {
            let all_ready = obj
                .status
                .get("containerStatuses")
                .and_then(|v| v.as_array())
                .map(|containers| {
                    !containers.is_empty()
                        && containers
                            .iter()
                            .all(|c| c.get("ready").and_then(|r| r.as_bool()).unwrap_or(false))
                })
                .unwrap_or(false);
            if all_ready {
                Health::Healthy
            } else {
                Health::Pending
            }
        }
        "Succeeded" => Health::Healthy,
        "Failed" => Health::Unhealthy,
        "Pending" => Health::Pending,
        _ => Health::Unknown,
    }
}

fn workload_health(obj: &Object) -> Health {
    let spec_replicas = obj.spec.get("replicas").and_then(|v| v.as_i64());
    let ready_replicas = obj.status.get("readyReplicas").and_then(|v| v.as_i64());
    match (ready_replicas, spec_replicas) {
        (Some(ready), Some(wanted)) if ready == wanted => Health::Healthy,
        (Some(0), _) => Health::Unhealthy,
        (Some(_), _) => Health::Pending,
        (None, _) => Health::Unknown,
    }
}

fn generic_health(obj: &Object) -> Health {
    let ready = obj
        .status
        .get("conditions")
        .and_then(|v| v.as_array())
        .and_then(|conditions| conditions.iter().find(|c| c.get("type").and_then(|t| t.as_str()) == Some("Ready")));
    match ready.and_then(|c| c.get("status")).and_then(|s| s.as_str()) {
        Some("True") => Health::Healthy,
        Some("False") => Health::Unhealthy,
        _ => Health::Unknown,
    }
}
