//! Bidirectional rewriting between physical and logical object shapes (§4.2).

pub mod kinds;

use crate::error::{Error, Result};
use crate::gvr::Gvr;
use crate::namespace::NamespaceMapper;
use crate::object::{LogicalObject, Object, PhysicalObject};
use chrono::Utc;
use kinds::Kind;

/// Annotation keys the engine itself writes onto logical objects (§6
/// "Annotations written on logical objects"). Kept as a table per §9
/// ("Transformer as data, not code").
pub mod annotation_keys {
    /// Prefix every engine-owned annotation and label carries, so
    /// [`super::ResourceTransformer::transform_to_physical`] can strip them
    /// by prefix alone.
    pub const ENGINE_PREFIX: &str = "sync.kcp.io/";

    /// The SyncTarget's UID.
    pub const SYNC_TARGET_UID: &str = "sync.kcp.io/sync-target-uid";
    /// The SyncTarget's name.
    pub const SYNC_TARGET_NAME: &str = "sync.kcp.io/sync-target-name";
    /// The workspace path, e.g. `root:my-workspace`.
    pub const LOGICAL_CLUSTER: &str = "sync.kcp.io/logical-cluster";
    /// When this object was last pulled upstream.
    pub const UPSTREAM_SYNC_TIMESTAMP: &str = "sync.kcp.io/upstream-sync-timestamp";
    /// The physical object's `metadata.generation` at sync time.
    pub const ORIGINAL_GENERATION: &str = "sync.kcp.io/original-generation";
    /// The physical object's `metadata.resourceVersion` at sync time.
    pub const ORIGINAL_RESOURCE_VERSION: &str = "sync.kcp.io/original-resourceversion";
}

/// Cluster-specific finalizers that must never survive onto the logical
/// object (§4.2 step 5). Table, not code, per §9.
const DROPPED_FINALIZERS: &[&str] = &[
    "kubernetes.io/pv-protection",
    "kubernetes.io/pvc-protection",
];

/// API groups the transformer refuses to touch outright (§4.2 `shouldTransform`).
const REJECTED_GROUPS: &[&str] = &["sync.kcp.io", "upstreamsync.kcp.io"];
/// Resource plurals rejected regardless of group.
const REJECTED_RESOURCES: &[&str] = &["events", "secrets"];

/// Stateless rewriter between physical and logical object shapes.
///
/// Constructed fresh per reconcile cycle (or per SyncTarget), as §3's
/// "Lifecycles" note specifies: it owns no durable state.
#[derive(Debug, Clone)]
pub struct ResourceTransformer {
    workspace: String,
    sync_target_name: String,
    sync_target_uid: String,
    namespace_mapper: NamespaceMapper,
}

impl ResourceTransformer {
    /// Build a transformer scoped to one `(workspace, SyncTarget)` pair.
    pub fn new(workspace: impl Into<String>, sync_target_name: impl Into<String>, sync_target_uid: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            sync_target_name: sync_target_name.into(),
            sync_target_uid: sync_target_uid.into(),
            namespace_mapper: NamespaceMapper::new(),
        }
    }

    /// Whether `shouldTransform` would reject this gvr/object outright
    /// (§4.2): engine-internal API groups, `events`, and `secrets` by default.
    pub fn should_transform(&self, gvr: &Gvr, _obj: &Object) -> bool {
        if REJECTED_GROUPS.contains(&gvr.group.as_str()) {
            return false;
        }
        !REJECTED_RESOURCES.contains(&gvr.resource.as_str())
    }

    /// As [`Self::transform_from_physical`], but accepts the `obj` as
    /// `Option` so callers reading from an external client that can return
    /// "nothing" surface §4.2 step 1 ("Fail if `obj` is null") as a typed
    /// error instead of a panic.
    pub fn transform_from_physical_opt(&self, obj: Option<&PhysicalObject>) -> Result<LogicalObject> {
        self.transform_from_physical(obj.ok_or(Error::NilObject)?)
    }

    /// Rewrite a physical object into its logical shape (§4.2).
    pub fn transform_from_physical(&self, obj: &PhysicalObject) -> Result<LogicalObject> {
        let mut out = obj.0.clone();

        let generation = out.metadata.generation;
        let resource_version = out.metadata.resource_version.clone();

        out.annotations_mut()
            .insert(annotation_keys::SYNC_TARGET_UID.to_string(), self.sync_target_uid.clone());
        out.annotations_mut()
            .insert(annotation_keys::SYNC_TARGET_NAME.to_string(), self.sync_target_name.clone());
        out.annotations_mut()
            .insert(annotation_keys::LOGICAL_CLUSTER.to_string(), self.workspace.clone());
        out.annotations_mut()
            .insert(annotation_keys::UPSTREAM_SYNC_TIMESTAMP.to_string(), Utc::now().to_rfc3339());
        if let Some(generation) = generation.filter(|g| *g != 0) {
            out.annotations_mut()
                .insert(annotation_keys::ORIGINAL_GENERATION.to_string(), generation.to_string());
        }
        if let Some(rv) = resource_version {
            out.annotations_mut()
                .insert(annotation_keys::ORIGINAL_RESOURCE_VERSION.to_string(), rv);
        }

        let physical_ns = out.metadata.namespace.clone().unwrap_or_default();
        if !physical_ns.is_empty() {
            out.metadata.namespace = Some(self.namespace_mapper.to_logical(&physical_ns, &self.sync_target_name));
        }

        out.metadata.uid = None;
        out.metadata.resource_version = None;
        out.metadata.generation = None;
        out.metadata.self_link = None;
        out.metadata.deletion_timestamp = None;
        out.metadata.deletion_grace_period_seconds = None;
        if let Some(finalizers) = out.metadata.finalizers.as_mut() {
            finalizers.retain(|f| !DROPPED_FINALIZERS.contains(&f.as_str()));
        }

        let kind = Kind::classify(out.kind());
        kinds::sanitize_physical(kind, &mut out.spec, &mut out.status);

        Ok(LogicalObject(out))
    }

    /// Inverse envelope of [`Self::transform_from_physical`] (§4.2).
    pub fn transform_to_physical(&self, obj: &LogicalObject) -> Result<PhysicalObject> {
        let mut out = obj.0.clone();

        if let Some(annotations) = out.metadata.annotations.as_mut() {
            annotations.retain(|k, _| !k.starts_with(annotation_keys::ENGINE_PREFIX));
        }
        if let Some(labels) = out.metadata.labels.as_mut() {
            labels.retain(|k, _| !k.starts_with(annotation_keys::ENGINE_PREFIX));
        }

        let logical_ns = out.metadata.namespace.clone().unwrap_or_default();
        if !logical_ns.is_empty() {
            out.metadata.namespace = Some(self.namespace_mapper.to_physical(&logical_ns, &self.sync_target_name)?);
        }

        out.metadata.uid = None;
        out.metadata.resource_version = None;
        out.metadata.generation = None;

        Ok(PhysicalObject(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use serde_json::json;

    fn sample_transformer() -> ResourceTransformer {
        ResourceTransformer::new("root:test-workspace", "test-sync-target", "st-uid-1")
    }

    fn sample_pod() -> PhysicalObject {
        let mut obj = Object::new("v1", "Pod", "test-pod");
        obj.metadata.namespace = Some("test-ns".into());
        obj.metadata.uid = Some("pod-uid-123".into());
        obj.metadata.resource_version = Some("12345".into());
        obj.metadata.generation = Some(5);
        obj.metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert("user.example.com/owner".into(), "alice".into());
        obj.spec = json!({"nodeName": "node-1", "serviceAccountName": "default"});
        obj.status = json!({"hostIP": "10.0.0.1", "phase": "Running"});
        PhysicalObject(obj)
    }

    #[test]
    fn scenario_transform_pod_from_physical() {
        let rt = sample_transformer();
        let logical = rt.transform_from_physical(&sample_pod()).unwrap();

        assert_eq!(logical.metadata.namespace.as_deref(), Some("kcp-test-sync-target-test-ns"));
        assert_eq!(
            logical.annotations().get(annotation_keys::ORIGINAL_GENERATION).map(String::as_str),
            Some("5")
        );
        assert_eq!(
            logical.annotations().get(annotation_keys::SYNC_TARGET_NAME).map(String::as_str),
            Some("test-sync-target")
        );
        assert_eq!(
            logical.annotations().get(annotation_keys::LOGICAL_CLUSTER).map(String::as_str),
            Some("root:test-workspace")
        );
        assert!(logical.metadata.uid.is_none());
        assert!(logical.metadata.resource_version.is_none());
        assert_eq!(logical.spec.get("nodeName"), None);
        assert_eq!(logical.status.get("hostIP"), None);
    }

    #[test]
    fn round_trip_preserves_user_data_and_namespace() {
        let rt = sample_transformer();
        let physical = sample_pod();
        let logical = rt.transform_from_physical(&physical).unwrap();
        let back = rt.transform_to_physical(&logical).unwrap();

        assert_eq!(back.metadata.namespace, physical.metadata.namespace);
        assert_eq!(
            back.annotations().get("user.example.com/owner"),
            physical.annotations().get("user.example.com/owner")
        );
        for key in [
            annotation_keys::SYNC_TARGET_UID,
            annotation_keys::SYNC_TARGET_NAME,
            annotation_keys::LOGICAL_CLUSTER,
            annotation_keys::UPSTREAM_SYNC_TIMESTAMP,
            annotation_keys::ORIGINAL_GENERATION,
            annotation_keys::ORIGINAL_RESOURCE_VERSION,
        ] {
            assert!(back.annotations().get(key).is_none(), "{key} leaked into physical object");
        }
    }

    #[test]
    fn should_transform_rejects_secrets_and_engine_groups() {
        let rt = sample_transformer();
        let obj = Object::new("v1", "Secret", "s");
        assert!(!rt.should_transform(&Gvr::core("v1", "secrets"), &obj));
        assert!(!rt.should_transform(&Gvr::new("sync.kcp.io", "v1alpha1", "synctargets"), &obj));
        assert!(rt.should_transform(&Gvr::core("v1", "pods"), &obj));
    }

    #[test]
    fn nil_like_generation_zero_is_not_recorded() {
        let rt = sample_transformer();
        let mut obj = Object::new("v1", "Pod", "p");
        obj.metadata.generation = Some(0);
        let logical = rt.transform_from_physical(&PhysicalObject(obj)).unwrap();
        assert!(logical.annotations().get(annotation_keys::ORIGINAL_GENERATION).is_none());
    }
}
