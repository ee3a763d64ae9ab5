//! In-process reference adapters for the external collaborator traits in
//! `syncer_core::contracts`.
//!
//! The engine is deliberately decoupled from any particular backing store
//! (§6 "Consumed from external collaborators", §2 Non-goals: "persisting
//! workspace state"); a real deployment swaps these for adapters backed by
//! a kcp/Kubernetes apiserver. These in-memory implementations exist so the
//! binary in this crate is runnable standalone and so the reconciler's
//! generic parameters have something concrete to bind to.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use syncer_core::contracts::{CertificateValidator, ClientError, Commit, DynamicClient, Informer, PhysicalClientFactory, SyncTargetResolver};
use syncer_core::error::{Error as CoreError, Result as CoreResult};
use syncer_core::gvr::{DiscoveredResource, Gvr};
use syncer_core::object::{Object, PhysicalObject};
use syncer_core::sync_target::SyncTarget;

/// Shared backing map for the in-memory adapters below, so the informer,
/// committer and resolver all observe the same SyncTarget set.
pub type SharedTargetStore = Arc<RwLock<HashMap<String, SyncTarget>>>;

/// Build a [`SharedTargetStore`] seeded with `seed`.
pub fn shared_target_store(seed: Vec<SyncTarget>) -> SharedTargetStore {
    Arc::new(RwLock::new(seed.into_iter().map(|t| (t.key(), t)).collect()))
}

/// Lists/gets SyncTargets out of a [`SharedTargetStore`].
pub struct InMemoryInformer {
    targets: SharedTargetStore,
}

impl InMemoryInformer {
    pub fn new(targets: SharedTargetStore) -> Self {
        Self { targets }
    }

    /// Insert or replace a SyncTarget, as an informer's watch would on an add/update event.
    pub fn upsert(&self, target: SyncTarget) {
        self.targets.write().insert(target.key(), target);
    }
}

#[async_trait]
impl Informer for InMemoryInformer {
    async fn list(&self) -> CoreResult<Vec<SyncTarget>> {
        Ok(self.targets.read().values().cloned().collect())
    }

    async fn get_by_cluster(&self, cluster: &str, name: &str) -> CoreResult<Option<SyncTarget>> {
        let key = format!("{cluster}/{name}");
        Ok(self.targets.read().get(&key).cloned())
    }
}

/// Persists SyncTarget status deltas to the same in-memory map the
/// informer reads from, standing in for a real commit-to-apiserver call.
pub struct InMemoryCommitter {
    targets: SharedTargetStore,
}

impl InMemoryCommitter {
    pub fn new(targets: SharedTargetStore) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl Commit for InMemoryCommitter {
    async fn commit(&self, old: &SyncTarget, new: &SyncTarget) -> CoreResult<()> {
        if old.key() != new.key() {
            return Err(CoreError::NotLogicalNamespace {
                namespace: new.key(),
                sync_target: old.key(),
            });
        }
        self.targets.write().insert(new.key(), new.clone());
        Ok(())
    }
}

/// A single physical-cluster client backed by an in-memory object store,
/// scoped to one SyncTarget for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryDynamicClient {
    objects: RwLock<HashMap<String, Object>>,
    discovered: Vec<DiscoveredResource>,
}

impl InMemoryDynamicClient {
    pub fn new(discovered: Vec<DiscoveredResource>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            discovered,
        }
    }
}

#[async_trait]
impl DynamicClient for InMemoryDynamicClient {
    async fn list(&self, _gvr: &Gvr, namespace: &str) -> Result<Vec<PhysicalObject>, ClientError> {
        Ok(self
            .objects
            .read()
            .values()
            .filter(|o| namespace.is_empty() || o.namespace() == namespace)
            .cloned()
            .map(PhysicalObject)
            .collect())
    }

    async fn get(&self, _gvr: &Gvr, _namespace: &str, name: &str) -> Result<PhysicalObject, ClientError> {
        self.objects.read().get(name).cloned().map(PhysicalObject).ok_or_else(|| ClientError::not_found(name))
    }

    async fn create(&self, _gvr: &Gvr, _namespace: &str, obj: &Object) -> Result<Object, ClientError> {
        self.objects.write().insert(obj.name().to_string(), obj.clone());
        Ok(obj.clone())
    }

    async fn update(&self, _gvr: &Gvr, _namespace: &str, obj: &Object) -> Result<Object, ClientError> {
        self.objects.write().insert(obj.name().to_string(), obj.clone());
        Ok(obj.clone())
    }

    async fn update_status(&self, _gvr: &Gvr, _namespace: &str, obj: &Object) -> Result<Object, ClientError> {
        self.objects.write().insert(obj.name().to_string(), obj.clone());
        Ok(obj.clone())
    }

    async fn delete(&self, _gvr: &Gvr, _namespace: &str, name: &str) -> Result<(), ClientError> {
        self.objects.write().remove(name);
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<DiscoveredResource>, ClientError> {
        Ok(self.discovered.clone())
    }
}

/// Hands out one shared [`InMemoryDynamicClient`] per SyncTarget UID,
/// creating it on first use (§4.7 step 4 "Obtain/establish physical client").
#[derive(Default)]
pub struct InMemoryClientFactory {
    clients: RwLock<HashMap<String, Arc<InMemoryDynamicClient>>>,
    seed_discovery: Vec<DiscoveredResource>,
}

impl InMemoryClientFactory {
    pub fn new(seed_discovery: Vec<DiscoveredResource>) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            seed_discovery,
        }
    }
}

#[async_trait]
impl PhysicalClientFactory for InMemoryClientFactory {
    async fn client_for(&self, sync_target: &SyncTarget) -> Result<Arc<dyn DynamicClient>, ClientError> {
        if let Some(existing) = self.clients.read().get(&sync_target.uid) {
            return Ok(Arc::clone(existing) as Arc<dyn DynamicClient>);
        }
        let client = Arc::new(InMemoryDynamicClient::new(self.seed_discovery.clone()));
        self.clients.write().insert(sync_target.uid.clone(), Arc::clone(&client));
        Ok(client as Arc<dyn DynamicClient>)
    }
}

/// Accepts any identity of the form `system:syncer:<id>`; the username
/// pattern itself is checked by [`syncer_endpoint::auth::authorize`].
pub struct AlwaysValidCertificate;

#[async_trait]
impl CertificateValidator for AlwaysValidCertificate {
    async fn validate_certificate(&self, _user_name: &str) -> CoreResult<()> {
        Ok(())
    }
}

/// Resolves a syncer to the SyncTarget whose `uid` equals `syncer_id`, in
/// the given workspace, reading from the same store the reconciler uses.
pub struct InformerBackedResolver {
    targets: SharedTargetStore,
}

impl InformerBackedResolver {
    pub fn new(targets: SharedTargetStore) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl SyncTargetResolver for InformerBackedResolver {
    async fn get_sync_target_for_syncer(&self, syncer_id: &str, workspace: &str) -> CoreResult<Option<SyncTarget>> {
        Ok(self
            .targets
            .read()
            .values()
            .find(|t| t.uid == syncer_id && t.logical_cluster == workspace)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncer_core::sync_target::{SyncTargetSpec, SyncTargetStatus};

    fn target(uid: &str, workspace: &str, name: &str) -> SyncTarget {
        SyncTarget {
            uid: uid.to_string(),
            name: name.to_string(),
            logical_cluster: workspace.to_string(),
            spec: SyncTargetSpec {
                location: "dc1".to_string(),
                supported_resource_types: vec![],
            },
            status: SyncTargetStatus::default(),
        }
    }

    #[tokio::test]
    async fn committer_and_informer_share_state() {
        let store = shared_target_store(vec![target("uid-1", "root:ws", "t1")]);
        let informer = InMemoryInformer::new(Arc::clone(&store));
        let committer = InMemoryCommitter::new(Arc::clone(&store));

        let mut updated = target("uid-1", "root:ws", "t1");
        updated.status.last_sync_time = Some(chrono::Utc::now());
        committer.commit(&target("uid-1", "root:ws", "t1"), &updated).await.unwrap();

        let seen = informer.get_by_cluster("root:ws", "t1").await.unwrap().unwrap();
        assert!(seen.status.last_sync_time.is_some());
    }

    #[tokio::test]
    async fn resolver_matches_on_uid_and_workspace() {
        let store = shared_target_store(vec![target("uid-1", "root:ws", "t1")]);
        let resolver = InformerBackedResolver::new(store);
        assert!(resolver.get_sync_target_for_syncer("uid-1", "root:ws").await.unwrap().is_some());
        assert!(resolver.get_sync_target_for_syncer("uid-1", "root:other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn client_factory_returns_same_client_for_same_target() {
        let factory = InMemoryClientFactory::default();
        let t = target("uid-1", "root:ws", "t1");
        let a = factory.client_for(&t).await.unwrap();
        let b = factory.client_for(&t).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
