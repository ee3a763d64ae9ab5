//! Data model, namespace mapping and resource transformation for the
//! Upstream Sync Engine.
//!
//! This crate has no async runtime or I/O dependency beyond the trait
//! signatures in [`contracts`]; it mirrors the role `kube-core` plays for
//! `kube`: types and pure functions that the stateful crates (`syncer-runtime`,
//! `syncer-tunnel`, `syncer-endpoint`) build on.

pub mod contracts;
pub mod discovery;
pub mod error;
pub mod feature_gate;
pub mod gvr;
pub mod health;
pub mod namespace;
pub mod object;
pub mod sync_target;
pub mod transform;
pub mod uid;

pub use discovery::DiscoveryCache;
pub use error::{Error, Result};
pub use feature_gate::FeatureGates;
pub use gvr::{DiscoveredResource, Gvr};
pub use health::Health;
pub use namespace::NamespaceMapper;
pub use object::{LogicalObject, Object, PhysicalObject, TypeMeta};
pub use sync_target::{Condition, ConditionStatus, SyncTarget, SyncTargetSpec, SyncTargetStatus};
pub use transform::ResourceTransformer;
pub use uid::UidMapping;
pub use contracts::{ClientError, Commit, DynamicClient, Informer, InformerEvent, PhysicalClientFactory};
