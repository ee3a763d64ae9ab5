//! Applies resolved/transformed objects to their destination, with an
//! optional dry-run mode for diagnostics (§4.6).

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use syncer_core::contracts::{ClientError, DynamicClient};
use syncer_core::gvr::Gvr;
use syncer_core::object::Object;
use thiserror::Error;

/// Errors [`UpdateApplier::apply`] can report.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The downstream client rejected the write.
    #[error("apply failed: {0}")]
    Client(#[from] ClientError),
}

/// Which operation an [`Update`] performs (§4.6 `update.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    /// The logical counterpart doesn't exist yet.
    Create,
    /// The logical counterpart exists and its spec/metadata changed.
    Update,
    /// Only `status` changed.
    Status,
    /// Remove the logical counterpart.
    Delete,
}

/// One object to reconcile toward the destination client (§4.6 `apply(update)`).
#[derive(Debug, Clone)]
pub struct Update {
    /// Which operation to perform.
    pub type_: UpdateType,
    /// The resource's group/version/resource.
    pub gvr: Gvr,
    /// Namespace, or empty for cluster-scoped resources.
    pub namespace: String,
    /// The object to write. Only `object.name()` is used for `Delete`.
    pub object: Object,
}

/// The outcome of applying one [`Update`] (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The object was created.
    Created,
    /// The object was updated.
    Updated,
    /// The object's status subresource was updated.
    StatusUpdated,
    /// The object was deleted, or was already gone (`NotFound` is a no-op, §4.6).
    Deleted,
    /// Dry-run mode was active; no write was issued.
    DryRun,
}

/// Applies resolved objects to a [`DynamicClient`], counting successes for
/// the status tracker (§4.6, §4.7).
pub struct UpdateApplier<C: DynamicClient> {
    client: C,
    dry_run: Mutex<bool>,
    applied_count: AtomicU64,
}

impl<C: DynamicClient> UpdateApplier<C> {
    /// Build an applier around `client`, starting with dry-run disabled.
    pub fn new(client: C) -> Self {
        Self {
            client,
            dry_run: Mutex::new(false),
            applied_count: AtomicU64::new(0),
        }
    }

    /// Enable or disable dry-run mode (§4.6 `SetDryRun`).
    pub fn set_dry_run(&self, enabled: bool) {
        *self.dry_run.lock() = enabled;
    }

    /// Dispatch `update` by its [`UpdateType`] (§4.6 `Apply`). Errors surface
    /// unchanged except `NotFound` on `Delete`, which is a no-op.
    pub async fn apply(&self, update: &Update) -> Result<ApplyOutcome, ApplyError> {
        if *self.dry_run.lock() {
            return Ok(ApplyOutcome::DryRun);
        }

        let outcome = match update.type_ {
            UpdateType::Create => {
                self.client.create(&update.gvr, &update.namespace, &update.object).await?;
                ApplyOutcome::Created
            }
            UpdateType::Update => {
                self.client.update(&update.gvr, &update.namespace, &update.object).await?;
                ApplyOutcome::Updated
            }
            UpdateType::Status => {
                self.client.update_status(&update.gvr, &update.namespace, &update.object).await?;
                ApplyOutcome::StatusUpdated
            }
            UpdateType::Delete => match self.client.delete(&update.gvr, &update.namespace, update.object.name()).await {
                Ok(()) => ApplyOutcome::Deleted,
                Err(e) if e.is_not_found() => ApplyOutcome::Deleted,
                Err(e) => return Err(e.into()),
            },
        };
        self.applied_count.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    }

    /// Apply several updates in order, stopping at the first error (§4.6 `ApplyBatch`).
    pub async fn apply_batch(&self, updates: &[Update]) -> Result<Vec<ApplyOutcome>, ApplyError> {
        let mut outcomes = Vec::with_capacity(updates.len());
        for update in updates {
            outcomes.push(self.apply(update).await?);
        }
        Ok(outcomes)
    }

    /// Total count of non-dry-run applies issued so far (§4.6 `AppliedCount`).
    pub fn applied_count(&self) -> u64 {
        self.applied_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::HashMap;
    use syncer_core::gvr::DiscoveredResource;
    use syncer_core::object::PhysicalObject;

    #[derive(Default)]
    struct FakeClient {
        objects: SyncMutex<HashMap<String, Object>>,
    }

    #[async_trait]
    impl DynamicClient for FakeClient {
        async fn list(&self, _gvr: &Gvr, _namespace: &str) -> Result<Vec<PhysicalObject>, ClientError> {
            Ok(self.objects.lock().values().cloned().map(PhysicalObject).collect())
        }
        async fn get(&self, _gvr: &Gvr, _namespace: &str, name: &str) -> Result<PhysicalObject, ClientError> {
            self.objects
                .lock()
                .get(name)
                .cloned()
                .map(PhysicalObject)
                .ok_or_else(|| ClientError::not_found(name))
        }
        async fn create(&self, _gvr: &Gvr, _namespace: &str, obj: &Object) -> Result<Object, ClientError> {
            self.objects.lock().insert(obj.name().to_string(), obj.clone());
            Ok(obj.clone())
        }
        async fn update(&self, _gvr: &Gvr, _namespace: &str, obj: &Object) -> Result<Object, ClientError> {
            self.objects.lock().insert(obj.name().to_string(), obj.clone());
            Ok(obj.clone())
        }
        async fn update_status(&self, _gvr: &Gvr, _namespace: &str, obj: &Object) -> Result<Object, ClientError> {
            self.objects.lock().insert(obj.name().to_string(), obj.clone());
            Ok(obj.clone())
        }
        async fn delete(&self, _gvr: &Gvr, _namespace: &str, name: &str) -> Result<(), ClientError> {
            self.objects.lock().remove(name);
            Ok(())
        }
        async fn discover(&self) -> Result<Vec<DiscoveredResource>, ClientError> {
            Ok(vec![])
        }
    }

    fn gvr() -> Gvr {
        Gvr::core("v1", "configmaps")
    }

    fn update(type_: UpdateType, obj: Object) -> Update {
        Update {
            type_,
            gvr: gvr(),
            namespace: "ns".to_string(),
            object: obj,
        }
    }

    #[tokio::test]
    async fn apply_dispatches_create_then_update() {
        let applier = UpdateApplier::new(FakeClient::default());
        let obj = Object::new("v1", "ConfigMap", "c1");
        assert_eq!(applier.apply(&update(UpdateType::Create, obj.clone())).await.unwrap(), ApplyOutcome::Created);
        assert_eq!(applier.apply(&update(UpdateType::Update, obj)).await.unwrap(), ApplyOutcome::Updated);
        assert_eq!(applier.applied_count(), 2);
    }

    #[tokio::test]
    async fn apply_dispatches_status() {
        let applier = UpdateApplier::new(FakeClient::default());
        let obj = Object::new("v1", "ConfigMap", "c1");
        assert_eq!(applier.apply(&update(UpdateType::Status, obj)).await.unwrap(), ApplyOutcome::StatusUpdated);
        assert_eq!(applier.applied_count(), 1);
    }

    #[tokio::test]
    async fn delete_on_existing_object_removes_it() {
        let client = FakeClient::default();
        let obj = Object::new("v1", "ConfigMap", "c1");
        client.objects.lock().insert(obj.name().to_string(), obj.clone());
        let applier = UpdateApplier::new(client);
        assert_eq!(applier.apply(&update(UpdateType::Delete, obj)).await.unwrap(), ApplyOutcome::Deleted);
        assert!(applier.client.objects.lock().is_empty());
    }

    #[tokio::test]
    async fn delete_not_found_is_a_no_op_success() {
        let applier = UpdateApplier::new(FakeClient::default());
        let obj = Object::new("v1", "ConfigMap", "gone");
        assert_eq!(applier.apply(&update(UpdateType::Delete, obj)).await.unwrap(), ApplyOutcome::Deleted);
        assert_eq!(applier.applied_count(), 1);
    }

    #[tokio::test]
    async fn dry_run_skips_writes_and_does_not_count() {
        let applier = UpdateApplier::new(FakeClient::default());
        applier.set_dry_run(true);
        let obj = Object::new("v1", "ConfigMap", "c1");
        assert_eq!(applier.apply(&update(UpdateType::Create, obj)).await.unwrap(), ApplyOutcome::DryRun);
        assert_eq!(applier.applied_count(), 0);
    }

    #[tokio::test]
    async fn apply_batch_stops_at_first_error() {
        struct Always404;
        #[async_trait]
        impl DynamicClient for Always404 {
            async fn list(&self, _: &Gvr, _: &str) -> Result<Vec<PhysicalObject>, ClientError> {
                Ok(vec![])
            }
            async fn get(&self, _: &Gvr, _: &str, name: &str) -> Result<PhysicalObject, ClientError> {
                Err(ClientError::not_found(name))
            }
            async fn create(&self, _: &Gvr, _: &str, _: &Object) -> Result<Object, ClientError> {
                Err(ClientError::Other("rejected".to_string()))
            }
            async fn update(&self, _: &Gvr, _: &str, obj: &Object) -> Result<Object, ClientError> {
                Ok(obj.clone())
            }
            async fn update_status(&self, _: &Gvr, _: &str, obj: &Object) -> Result<Object, ClientError> {
                Ok(obj.clone())
            }
            async fn delete(&self, _: &Gvr, _: &str, _: &str) -> Result<(), ClientError> {
                Ok(())
            }
            async fn discover(&self) -> Result<Vec<DiscoveredResource>, ClientError> {
                Ok(vec![])
            }
        }
        let applier = UpdateApplier::new(Always404);
        let updates = vec![update(UpdateType::Create, Object::new("v1", "ConfigMap", "c1"))];
        assert!(applier.apply_batch(&updates).await.is_err());
    }
}
