//! External collaborator contracts (§6 "Consumed from external collaborators").
//!
//! The engine depends only on these traits; concrete implementations (a real
//! apiserver client, a real informer, etc.) live outside this workspace.
//! This mirrors how `kube_runtime::reflector`/`Controller` depend on the
//! `kube_client::Api` trait surface rather than a concrete HTTP stack.

use crate::error::Result;
use crate::gvr::{DiscoveredResource, Gvr};
use crate::object::{Object, PhysicalObject};
use crate::sync_target::SyncTarget;
use async_trait::async_trait;
use thiserror::Error;

/// Errors a [`DynamicClient`] implementation may report. `NotFound` is
/// distinguished per §6 so callers (Delete in particular) can treat it as
/// a no-op.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other transient or permanent failure talking to the backing store.
    #[error("client error: {0}")]
    Other(String),
}

impl ClientError {
    /// Convenience constructor.
    pub fn not_found(key: impl Into<String>) -> Self {
        ClientError::NotFound(key.into())
    }

    /// True if this is the distinguished not-found case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// `Informer`: `list`, `getByCluster`, `addEventHandler` (§6).
#[async_trait]
pub trait Informer: Send + Sync {
    /// List all known SyncTargets.
    async fn list(&self) -> Result<Vec<SyncTarget>>;

    /// Fetch one SyncTarget by `(logicalCluster, name)`. Returns `Ok(None)`
    /// if it does not exist — the Reconciler treats that as a delete
    /// (§4.7 step 1).
    async fn get_by_cluster(&self, cluster: &str, name: &str) -> Result<Option<SyncTarget>>;
}

/// A single add/update/delete callback delivered by the informer's watch.
#[derive(Debug, Clone)]
pub enum InformerEvent {
    /// A SyncTarget was created.
    Add(SyncTarget),
    /// A SyncTarget was updated; carries the new value.
    Update(SyncTarget),
    /// A SyncTarget's key was deleted.
    Delete(String),
}

/// Dynamic resource client, scoped to one `(workspace-or-cluster, gvr)`
/// pair, exactly as §6 describes: `resource(gvr).namespace(ns).{verb}(...)`.
/// Modelled here as one trait per verb group instead of the fluent builder,
/// since Rust's ownership rules make a persistent builder awkward; callers
/// pass `gvr`/`namespace` per call instead.
#[async_trait]
pub trait DynamicClient: Send + Sync {
    /// List objects of `gvr` in `namespace` (empty for cluster-scoped).
    async fn list(&self, gvr: &Gvr, namespace: &str) -> std::result::Result<Vec<PhysicalObject>, ClientError>;

    /// Fetch a single object by name.
    async fn get(&self, gvr: &Gvr, namespace: &str, name: &str) -> std::result::Result<PhysicalObject, ClientError>;

    /// Create an object.
    async fn create(&self, gvr: &Gvr, namespace: &str, obj: &Object) -> std::result::Result<Object, ClientError>;

    /// Update an object (full replace).
    async fn update(&self, gvr: &Gvr, namespace: &str, obj: &Object) -> std::result::Result<Object, ClientError>;

    /// Update only the `status` subresource.
    async fn update_status(&self, gvr: &Gvr, namespace: &str, obj: &Object) -> std::result::Result<Object, ClientError>;

    /// Delete an object by name. Implementations should surface `NotFound`
    /// distinctly so [`crate::contracts::ClientError::is_not_found`] lets
    /// callers treat it as a no-op (§4.6, §7).
    async fn delete(&self, gvr: &Gvr, namespace: &str, name: &str) -> std::result::Result<(), ClientError>;

    /// List syncable resource kinds for discovery purposes (§4.3).
    async fn discover(&self) -> std::result::Result<Vec<DiscoveredResource>, ClientError>;
}

/// `commit(oldResource, newResource) -> error`: persists status deltas for
/// a SyncTarget (§6). Only called when `new` differs from `old`.
#[async_trait]
pub trait Commit: Send + Sync {
    /// Persist the difference between `old` and `new`.
    async fn commit(&self, old: &SyncTarget, new: &SyncTarget) -> Result<()>;
}

/// `validateCertificate(userInfo) -> error`; expected username pattern
/// `system:syncer:<id>` (§6, §4.8 step 2).
#[async_trait]
pub trait CertificateValidator: Send + Sync {
    /// Validate the presented identity. `Ok(())` means the certificate
    /// itself checks out; the caller still has to check the username
    /// pattern separately (§4.8 step 2).
    async fn validate_certificate(&self, user_name: &str) -> Result<()>;
}

/// `getSyncTargetForSyncer(syncerID, workspace) -> SyncTarget | error` (§6).
#[async_trait]
pub trait SyncTargetResolver: Send + Sync {
    /// Resolve the SyncTarget a given syncer is authorized to act as.
    async fn get_sync_target_for_syncer(&self, syncer_id: &str, workspace: &str) -> Result<Option<SyncTarget>>;
}

#[async_trait]
impl<T: DynamicClient + ?Sized> DynamicClient for std::sync::Arc<T> {
    async fn list(&self, gvr: &Gvr, namespace: &str) -> std::result::Result<Vec<PhysicalObject>, ClientError> {
        (**self).list(gvr, namespace).await
    }
    async fn get(&self, gvr: &Gvr, namespace: &str, name: &str) -> std::result::Result<PhysicalObject, ClientError> {
        (**self).get(gvr, namespace, name).await
    }
    async fn create(&self, gvr: &Gvr, namespace: &str, obj: &Object) -> std::result::Result<Object, ClientError> {
        (**self).create(gvr, namespace, obj).await
    }
    async fn update(&self, gvr: &Gvr, namespace: &str, obj: &Object) -> std::result::Result<Object, ClientError> {
        (**self).update(gvr, namespace, obj).await
    }
    async fn update_status(&self, gvr: &Gvr, namespace: &str, obj: &Object) -> std::result::Result<Object, ClientError> {
        (**self).update_status(gvr, namespace, obj).await
    }
    async fn delete(&self, gvr: &Gvr, namespace: &str, name: &str) -> std::result::Result<(), ClientError> {
        (**self).delete(gvr, namespace, name).await
    }
    async fn discover(&self) -> std::result::Result<Vec<DiscoveredResource>, ClientError> {
        (**self).discover().await
    }
}

/// Obtains/establishes the opaque physical-cluster client for a SyncTarget
/// (§4.7 step 4: "Obtain/establish physical client (opaque external)").
/// Returned as `Arc<dyn DynamicClient>` rather than an associated type so
/// [`crate::discovery`]-unrelated callers can hold the factory as a trait object.
#[async_trait]
pub trait PhysicalClientFactory: Send + Sync {
    /// Produce (or reuse a cached) client for `sync_target`.
    async fn client_for(&self, sync_target: &SyncTarget) -> std::result::Result<std::sync::Arc<dyn DynamicClient>, ClientError>;
}
