//! A dynamically-typed representation of physical and logical resources.
//!
//! Modelled on [`kube_core::DynamicObject`]: a small envelope of well-known
//! metadata plus an opaque `spec`/`status` tree, so the engine never needs
//! to know about a resource kind at compile time except for the narrow
//! per-kind sanitation rules in [`crate::transform::kinds`].

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `apiVersion` + `kind`, flattened onto the envelope the way
/// `kube_core::metadata::TypeMeta` does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMeta {
    /// e.g. `v1`, `apps/v1`.
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    /// e.g. `Pod`, `Deployment`.
    pub kind: String,
}

/// A dynamically typed resource: standard metadata (§3 "PhysicalObject /
/// LogicalObject") plus an opaque `spec`/`status` tree.
///
/// The same type represents both the physical and the logical shape of a
/// resource; [`crate::transform::ResourceTransformer`] converts between the
/// two. Callers that need to distinguish the two at the type level should
/// use the [`Physical`]/[`Logical`] newtypes below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Type information; absent for some synthetic objects.
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    /// Standard object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Kind-specific declared state. Opaque to everything except
    /// [`crate::transform::kinds`].
    #[serde(default)]
    pub spec: serde_json::Value,
    /// Kind-specific observed state.
    #[serde(default)]
    pub status: serde_json::Value,
}

impl Object {
    /// Construct a minimal object of the given kind.
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            types: Some(TypeMeta {
                api_version: api_version.into(),
                kind: kind.into(),
            }),
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            spec: serde_json::Value::Null,
            status: serde_json::Value::Null,
        }
    }

    /// The resource kind, or `""` if untyped.
    pub fn kind(&self) -> &str {
        self.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default()
    }

    /// `metadata.name`, or `""` if unset (should not happen for well-formed objects).
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// `metadata.namespace`, empty string for cluster-scoped objects.
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// `"<namespace>/<name>"`, or just `"<name>"` for cluster-scoped objects,
    /// matching `AggregatedStatus.resourceKey` in §3.
    pub fn resource_key(&self) -> String {
        if self.namespace().is_empty() {
            self.name().to_string()
        } else {
            format!("{}/{}", self.namespace(), self.name())
        }
    }

    /// Read-only view of the annotation map, defaulting to empty.
    pub fn annotations(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.metadata.annotations.as_ref().unwrap_or(&EMPTY)
    }

    /// Mutable view of the annotation map, creating it if absent.
    pub fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.metadata.annotations.get_or_insert_with(Default::default)
    }

    /// Read-only view of the label map, defaulting to empty.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();
        self.metadata.labels.as_ref().unwrap_or(&EMPTY)
    }

    /// Mutable view of the label map, creating it if absent.
    pub fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.metadata.labels.get_or_insert_with(Default::default)
    }

    /// Owner references, defaulting to empty.
    pub fn owner_references(&self) -> &[OwnerReference] {
        self.metadata.owner_references.as_deref().unwrap_or_default()
    }
}

/// A resource as observed on a downstream physical cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalObject(pub Object);

/// A resource as it should appear in (or was read from) a logical workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalObject(pub Object);

impl std::ops::Deref for PhysicalObject {
    type Target = Object;
    fn deref(&self) -> &Object {
        &self.0
    }
}
impl std::ops::DerefMut for PhysicalObject {
    fn deref_mut(&mut self) -> &mut Object {
        &mut self.0
    }
}
impl std::ops::Deref for LogicalObject {
    type Target = Object;
    fn deref(&self) -> &Object {
        &self.0
    }
}
impl std::ops::DerefMut for LogicalObject {
    fn deref_mut(&mut self) -> &mut Object {
        &mut self.0
    }
}

impl From<Object> for PhysicalObject {
    fn from(o: Object) -> Self {
        PhysicalObject(o)
    }
}
impl From<Object> for LogicalObject {
    fn from(o: Object) -> Self {
        LogicalObject(o)
    }
}
