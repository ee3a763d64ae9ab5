//! Core per-SyncTarget control loop (§4.7).
//!
//! State machine (conceptual): `Observed -> Ready? -> Discovering -> Syncing
//! -> StatusReporting -> Idle`. Transitions are driven entirely by enqueue
//! events — there is no explicit state field; each worker pass runs the
//! full pipeline and returns to `Idle` (waiting on the queue) regardless of
//! where it stopped.

use crate::aggregator::{ResourceStatus, StatusAggregator};
use crate::applier::{Update, UpdateApplier, UpdateType};
use crate::conflict::ConflictResolver;
use crate::error::ReconcileError;
use crate::gated::{build_aggregating, build_conflict_resolving, Aggregating, ConflictResolving};
use crate::queue::{Action, WorkItem, WorkQueue};
use crate::status_tracker::StatusTracker;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use syncer_core::contracts::{Commit, DynamicClient, Informer, PhysicalClientFactory};
use syncer_core::discovery::DiscoveryCache;
use syncer_core::feature_gate::FeatureGates;
use syncer_core::sync_target::{Condition, ConditionStatus};
use syncer_core::transform::ResourceTransformer;
use syncer_core::uid::UidMapping;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tunables for [`Reconciler::run`] (§6 "Configuration surface").
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Worker task count (default 2, range 2-5).
    pub num_workers: usize,
    /// Cap on per-item retries before it's Forgot (default 5).
    pub max_retries: u32,
    /// Periodic full-sweep ticker interval (default 30s).
    pub sync_interval: Duration,
    /// How often a stale [`DiscoveryCache`] is allowed to go before a refresh is due.
    pub discovery_refresh_interval: Duration,
    /// Per-entry TTL handed to each SyncTarget's [`DiscoveryCache`].
    pub discovery_cache_ttl: Duration,
    /// Conflict/aggregation history ring-buffer bound.
    pub history_size: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            num_workers: 2,
            max_retries: 5,
            sync_interval: Duration::from_secs(30),
            discovery_refresh_interval: Duration::from_secs(300),
            discovery_cache_ttl: Duration::from_secs(300),
            history_size: 100,
        }
    }
}

/// Drives the per-SyncTarget reconcile loop. Informer events and a
/// periodic ticker feed a rate-limited [`WorkQueue`]; `num_workers` tasks
/// drain it, each running the pipeline in §4.7.
///
/// Two distinct dynamic clients are involved per pass: `client_factory`
/// produces the downstream physical-cluster client (discovery + list), and
/// `kcp_client` is the single shared client for the logical workspace that
/// `applyResourceToKCP` reads/writes (§4.7 step 6 — applying a transformed
/// object targets the logical workspace, not the physical cluster it came from).
pub struct Reconciler<I, F, K, M>
where
    I: Informer,
    F: PhysicalClientFactory,
    K: DynamicClient,
    M: Commit,
{
    informer: Arc<I>,
    client_factory: Arc<F>,
    kcp_client: Arc<K>,
    committer: Arc<M>,
    queue: Arc<WorkQueue>,
    discovery: RwLock<HashMap<String, Arc<DiscoveryCache>>>,
    status: Arc<StatusTracker>,
    conflict_resolver: Box<dyn ConflictResolving>,
    health_classifier: StatusAggregator,
    aggregator: Box<dyn Aggregating>,
    applier: UpdateApplier<Arc<K>>,
    config: ReconcilerConfig,
}

impl<I, F, K, M> Reconciler<I, F, K, M>
where
    I: Informer + 'static,
    F: PhysicalClientFactory + 'static,
    K: DynamicClient + 'static,
    M: Commit + 'static,
{
    /// Build a reconciler against `gates` (§6 "Feature gates"). `upstreamSyncConflictResolution`
    /// selects between a real [`ConflictResolver`] and a no-op that always takes
    /// physical as-is (§7 "conflict resolution disabled"); `upstreamSyncAggregation`
    /// likewise selects between a real [`StatusAggregator`] and a no-op that
    /// reports [`syncer_core::error::Error::Disabled`] (§7).
    pub fn new(
        informer: I,
        client_factory: F,
        kcp_client: K,
        committer: M,
        config: ReconcilerConfig,
        gates: FeatureGates,
    ) -> Self {
        let kcp_client = Arc::new(kcp_client);
        Self {
            informer: Arc::new(informer),
            client_factory: Arc::new(client_factory),
            kcp_client: Arc::clone(&kcp_client),
            committer: Arc::new(committer),
            queue: Arc::new(WorkQueue::new(config.max_retries)),
            discovery: RwLock::new(HashMap::new()),
            status: Arc::new(StatusTracker::new()),
            conflict_resolver: build_conflict_resolving(gates, config.history_size),
            health_classifier: StatusAggregator::new(ConflictResolver::new(config.history_size)),
            aggregator: build_aggregating(gates, config.history_size),
            applier: UpdateApplier::new(kcp_client),
            config,
        }
    }

    /// A read-only snapshot of `key`'s processing history (§4.7 "read-only accessor").
    pub fn status_for(&self, key: &str) -> crate::status_tracker::TargetStatus {
        self.status.get(key)
    }

    /// The `n` most recent conflict resolutions observed across all SyncTargets.
    pub fn recent_conflicts(&self, n: usize) -> Vec<crate::conflict::Resolution> {
        self.conflict_resolver.recent(n)
    }

    /// Enqueue `key` for immediate processing (e.g. an informer callback).
    pub async fn enqueue(&self, key: impl Into<String>, action: Action) {
        self.queue.add(key, action).await;
    }

    /// Spawn `num_workers` worker tasks plus the periodic ticker, returning
    /// their join handles. Workers and the ticker observe `cancel` and exit
    /// cooperatively (§5 "Cancellation & timeouts").
    pub fn run(self: &Arc<Self>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.config.num_workers + 1);

        for worker_id in 0..self.config.num_workers {
            let this = Arc::clone(self);
            let worker_cancel = cancel.clone();
            handles.push(tokio::spawn(async move { this.worker_loop(worker_id, worker_cancel).await }));
        }

        let this = Arc::clone(self);
        let ticker_cancel = cancel.clone();
        handles.push(tokio::spawn(async move { this.ticker_loop(ticker_cancel).await }));

        let this = Arc::clone(self);
        let sweep_cancel = cancel;
        handles.push(tokio::spawn(async move { this.discovery_sweep_loop(sweep_cancel).await }));

        handles
    }

    /// Periodically evict expired entries from every per-SyncTarget
    /// [`DiscoveryCache`] (§4.3 "eviction by a periodic sweeper"), rather
    /// than relying solely on [`DiscoveryCache::syncable`]'s lazy filtering.
    async fn discovery_sweep_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.discovery_refresh_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("discovery sweep loop stopping on cancellation");
                    return;
                }
                _ = interval.tick() => {
                    let now = std::time::Instant::now();
                    let caches: Vec<Arc<DiscoveryCache>> = self.discovery.read().values().cloned().collect();
                    let swept: usize = caches.iter().map(|c| c.sweep_expired(now)).sum();
                    if swept > 0 {
                        debug!(swept, "discovery sweep evicted expired entries");
                    }
                }
            }
        }
    }

    async fn ticker_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.sync_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("ticker loop stopping on cancellation");
                    return;
                }
                _ = interval.tick() => {
                    self.enqueue_all_ready().await;
                }
            }
        }
    }

    async fn enqueue_all_ready(&self) {
        let targets = match self.informer.list().await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(error = %e, "periodic sweep: informer list failed");
                return;
            }
        };
        for target in targets.into_iter().filter(|t| t.is_ready()) {
            self.queue.add(target.key(), Action::Sync).await;
        }
    }

    async fn worker_loop(self: Arc<Self>, worker_id: usize, cancel: CancellationToken) {
        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(worker_id, "worker stopping on cancellation");
                    return;
                }
                item = self.queue.pop() => item,
            };

            // Cancellation mid-item: finish the in-flight op but do not
            // re-enqueue on failure; just Done and exit (§5).
            let key = item.target_key.clone();
            match self.process_one(&item).await {
                Ok(()) => {
                    self.queue.forget(&key).await;
                    self.status.record_success(&key, Utc::now());
                    info!(worker_id, key = %key, "reconcile succeeded");
                }
                Err(e) => {
                    self.status.record_error(&key, Utc::now());
                    if cancel.is_cancelled() {
                        self.queue.done(&key).await;
                        return;
                    }
                    error!(worker_id, key = %key, error = %e, "reconcile failed");
                    if !self.queue.add_rate_limited(&key, item.action).await {
                        warn!(key = %key, "max retries exceeded, forgetting item");
                        self.queue.forget(&key).await;
                    }
                }
            }
            self.queue.done(&key).await;
        }
    }

    /// Run the eight-step pipeline in §4.7 for one [`WorkItem`].
    async fn process_one(&self, item: &WorkItem) -> Result<(), ReconcileError> {
        let (cluster, name) = item
            .target_key
            .split_once('/')
            .ok_or_else(|| ReconcileError::NotFound(item.target_key.clone()))?;

        // Step 1: fetch, treating NotFound as a delete.
        let old = self
            .informer
            .get_by_cluster(cluster, name)
            .await
            .map_err(|e| ReconcileError::Informer(e.to_string()))?;
        let Some(old) = old else {
            debug!(key = %item.target_key, "sync target gone, treating as delete");
            return Ok(());
        };

        // Step 2: deep-copy for mutation; `old` retained for the commit diff.
        let mut new = old.clone();

        // Step 3: not-ready SyncTargets are a no-op success.
        if !new.is_ready() {
            debug!(key = %item.target_key, "sync target not ready, skipping");
            return Ok(());
        }

        if item.action == Action::Delete {
            return Ok(());
        }

        // Step 4: obtain/establish the physical client.
        let client = self
            .client_factory
            .client_for(&new)
            .await
            .map_err(|e| ReconcileError::PhysicalClient(e.to_string()))?;

        // Step 5: refresh discovery if stale.
        let discovery = self.discovery_cache_for(&item.target_key);
        let now = std::time::Instant::now();
        if discovery.is_stale(self.config.discovery_refresh_interval, now) {
            let discovered = client.discover().await?;
            discovery.refresh_if_stale(discovered, self.config.discovery_refresh_interval, now);
        }

        // Step 6: per syncable gvr, list physical objects and apply each
        // transformed object to the logical workspace (`applyResourceToKCP`).
        let transformer = ResourceTransformer::new(cluster, &new.name, &new.uid);
        let mut uid_mapping = UidMapping::new();
        let mut healths = Vec::new();
        let mut aggregated = Vec::new();
        let mut by_resource_key: HashMap<String, Vec<ResourceStatus>> = HashMap::new();

        for (gvr, _resource) in discovery.syncable(&new, now) {
            let physical_objects = client.list(&gvr, "").await?;
            for physical in &physical_objects {
                if !transformer.should_transform(&gvr, physical) {
                    continue;
                }
                let logical = transformer.transform_from_physical(physical)?;
                let namespace = logical.namespace().to_string();

                let existing = match self.kcp_client.get(&gvr, &namespace, logical.name()).await {
                    Ok(existing) => Some(existing),
                    Err(e) if e.is_not_found() => None,
                    Err(e) => return Err(e.into()),
                };
                let update_type = if existing.is_some() { UpdateType::Update } else { UpdateType::Create };
                let resolved = match existing {
                    Some(existing) => self.conflict_resolver.resolve(&logical.resource_key(), &existing, &logical),
                    None => logical.0.clone(),
                };

                self.applier
                    .apply(&Update {
                        type_: update_type,
                        gvr: gvr.clone(),
                        namespace: namespace.clone(),
                        object: resolved.clone(),
                    })
                    .await?;
                if let Some(uid) = physical.metadata.uid.clone() {
                    if let Some(new_uid) = resolved.metadata.uid.clone() {
                        let _ = uid_mapping.insert(uid, new_uid);
                    }
                }

                let health = self.health_classifier.determine_health(&resolved, &gvr);
                healths.push(health);
                let resource_status = ResourceStatus {
                    cluster_name: cluster.to_string(),
                    object: resolved,
                    last_updated: Utc::now(),
                    health,
                };
                by_resource_key
                    .entry(logical.resource_key())
                    .or_default()
                    .push(resource_status.clone());
                aggregated.push(resource_status);
            }
        }

        // Run the gated multi-source merge (§4.5) over what this pass
        // observed per logical key. A disabled gate is not a reconcile
        // failure; any other aggregation error is logged and skipped.
        for (resource_key, statuses) in &by_resource_key {
            match self.aggregator.aggregate(resource_key, statuses) {
                Ok(_) => {}
                Err(syncer_core::error::Error::Disabled(_)) => {}
                Err(e) => warn!(key = %resource_key, error = %e, "status aggregation failed"),
            }
        }

        // Step 7: roll up health and update status.
        let rollup = self.health_classifier.rollup(healths);
        let now_ts = Utc::now();
        new.status.last_sync_time = Some(now_ts);
        new.status.set_condition(Condition {
            type_: "SyncerReady".to_string(),
            status: health_to_condition(rollup),
            reason: format!("{rollup:?}"),
            message: format!("{} resources observed this pass", aggregated.len()),
            last_transition_time: now_ts,
        });

        // Step 8: persist the status diff.
        self.committer
            .commit(&old, &new)
            .await
            .map_err(|e| ReconcileError::Commit(e.to_string()))?;

        Ok(())
    }

    fn discovery_cache_for(&self, key: &str) -> Arc<DiscoveryCache> {
        if let Some(existing) = self.discovery.read().get(key) {
            return Arc::clone(existing);
        }
        let mut discovery = self.discovery.write();
        Arc::clone(
            discovery
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(DiscoveryCache::new(self.config.discovery_cache_ttl))),
        )
    }
}

fn health_to_condition(health: syncer_core::health::Health) -> ConditionStatus {
    use syncer_core::health::Health;
    match health {
        Health::Healthy => ConditionStatus::True,
        Health::Unhealthy => ConditionStatus::False,
        Health::Degraded | Health::Pending | Health::Unknown => ConditionStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::HashMap as StdHashMap;
    use syncer_core::contracts::ClientError;
    use syncer_core::gvr::{DiscoveredResource, Gvr};
    use syncer_core::object::{Object, PhysicalObject};
    use syncer_core::sync_target::{SyncTarget, SyncTargetSpec, SyncTargetStatus};
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Default)]
    struct FakeInformer {
        targets: AsyncMutex<StdHashMap<String, SyncTarget>>,
    }

    impl FakeInformer {
        fn with(target: SyncTarget) -> Self {
            let mut map = StdHashMap::new();
            map.insert(target.key(), target);
            Self {
                targets: AsyncMutex::new(map),
            }
        }
    }

    #[async_trait]
    impl Informer for FakeInformer {
        async fn list(&self) -> syncer_core::error::Result<Vec<SyncTarget>> {
            Ok(self.targets.lock().await.values().cloned().collect())
        }
        async fn get_by_cluster(&self, cluster: &str, name: &str) -> syncer_core::error::Result<Option<SyncTarget>> {
            Ok(self.targets.lock().await.get(&format!("{cluster}/{name}")).cloned())
        }
    }

    #[derive(Default)]
    struct FakeCommit {
        calls: SyncMutex<Vec<(SyncTarget, SyncTarget)>>,
    }

    #[async_trait]
    impl Commit for FakeCommit {
        async fn commit(&self, old: &SyncTarget, new: &SyncTarget) -> syncer_core::error::Result<()> {
            self.calls.lock().push((old.clone(), new.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeClient {
        objects: SyncMutex<StdHashMap<String, Object>>,
        discovered: Vec<DiscoveredResource>,
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
            Ok(self.discovered.clone())
        }
    }

    struct FakeClientFactory {
        client: Arc<FakeClient>,
    }

    #[async_trait]
    impl PhysicalClientFactory for FakeClientFactory {
        async fn client_for(&self, _sync_target: &SyncTarget) -> Result<Arc<dyn DynamicClient>, ClientError> {
            Ok(self.client.clone() as Arc<dyn DynamicClient>)
        }
    }

    fn ready_target(name: &str) -> SyncTarget {
        let mut status = SyncTargetStatus::default();
        status.set_condition(Condition {
            type_: "Ready".to_string(),
            status: ConditionStatus::True,
            reason: String::new(),
            message: String::new(),
            last_transition_time: Utc::now(),
        });
        SyncTarget {
            uid: format!("{name}-uid"),
            name: name.to_string(),
            logical_cluster: "root".to_string(),
            spec: SyncTargetSpec {
                location: "loc".to_string(),
                supported_resource_types: Vec::new(),
            },
            status,
        }
    }

    fn pods_resource() -> DiscoveredResource {
        DiscoveredResource {
            gvr: Gvr::core("v1", "pods"),
            namespaced: true,
            verbs: vec!["get".into(), "list".into(), "watch".into()],
            kind: "Pod".into(),
            last_discovered: std::time::Instant::now(),
        }
    }

    fn test_config() -> ReconcilerConfig {
        ReconcilerConfig {
            num_workers: 1,
            max_retries: 3,
            sync_interval: Duration::from_secs(3600),
            discovery_refresh_interval: Duration::from_secs(3600),
            discovery_cache_ttl: Duration::from_secs(3600),
            history_size: 10,
        }
    }

    #[tokio::test]
    async fn happy_path_syncs_physical_pod_into_kcp() {
        let target = ready_target("t1");
        let informer = FakeInformer::with(target.clone());
        let committer = FakeCommit::default();

        let mut pod = Object::new("v1", "Pod", "p1");
        pod.metadata.namespace = Some("default".to_string());
        let physical_client = FakeClient {
            objects: SyncMutex::new(StdHashMap::from([("p1".to_string(), pod)])),
            discovered: vec![pods_resource()],
        };
        let factory = FakeClientFactory {
            client: Arc::new(physical_client),
        };
        let kcp_client = FakeClient::default();

        let reconciler = Reconciler::new(informer, factory, kcp_client, committer, test_config(), FeatureGates::all_enabled());

        reconciler.enqueue(target.key(), Action::Sync).await;
        let item = reconciler.queue.pop().await;
        reconciler.process_one(&item).await.unwrap();

        assert_eq!(reconciler.kcp_client.objects.lock().len(), 1);
        assert_eq!(reconciler.committer.calls.lock().len(), 1);
        let status = reconciler.status_for(&target.key());
        assert_eq!(status, crate::status_tracker::TargetStatus::default(), "process_one alone does not touch the status tracker; that happens in worker_loop");
    }

    #[tokio::test]
    async fn not_ready_target_is_a_no_op() {
        let mut target = ready_target("t2");
        target.status = SyncTargetStatus::default(); // no Ready condition
        let informer = FakeInformer::with(target.clone());
        let committer = FakeCommit::default();
        let factory = FakeClientFactory {
            client: Arc::new(FakeClient::default()),
        };
        let kcp_client = FakeClient::default();

        let reconciler = Reconciler::new(informer, factory, kcp_client, committer, test_config(), FeatureGates::all_enabled());
        reconciler.enqueue(target.key(), Action::Sync).await;
        let item = reconciler.queue.pop().await;
        reconciler.process_one(&item).await.unwrap();

        assert!(reconciler.committer.calls.lock().is_empty(), "a not-ready target must never reach the committer");
    }

    #[tokio::test]
    async fn deleted_target_is_a_no_op() {
        let informer = FakeInformer::default();
        let committer = FakeCommit::default();
        let factory = FakeClientFactory {
            client: Arc::new(FakeClient::default()),
        };
        let kcp_client = FakeClient::default();

        let reconciler = Reconciler::new(informer, factory, kcp_client, committer, test_config(), FeatureGates::all_enabled());
        reconciler.enqueue("root/gone", Action::Delete).await;
        let item = reconciler.queue.pop().await;
        assert!(reconciler.process_one(&item).await.is_ok());
        assert!(reconciler.committer.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn worker_loop_records_success_and_forgets_the_item() {
        let target = ready_target("t3");
        let informer = FakeInformer::with(target.clone());
        let committer = FakeCommit::default();
        let factory = FakeClientFactory {
            client: Arc::new(FakeClient::default()),
        };
        let kcp_client = FakeClient::default();

        let reconciler = Arc::new(Reconciler::new(
            informer,
            factory,
            kcp_client,
            committer,
            test_config(),
            FeatureGates::all_enabled(),
        ));
        let cancel = CancellationToken::new();
        reconciler.enqueue(target.key(), Action::Sync).await;

        let worker = Arc::clone(&reconciler);
        let worker_cancel = cancel.clone();
        let handle = tokio::spawn(async move { worker.worker_loop(0, worker_cancel).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let status = reconciler.status_for(&target.key());
        assert_eq!(status.sync_count, 1);
        assert_eq!(status.error_count, 0);
        assert_eq!(reconciler.queue.len().await, 0, "a successful pass forgets the item");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn disabled_conflict_resolution_gate_always_takes_physical() {
        let target = ready_target("t4");
        let informer = FakeInformer::with(target.clone());
        let committer = FakeCommit::default();

        let mut physical_pod = Object::new("v1", "Pod", "p1");
        physical_pod.metadata.namespace = Some("default".to_string());
        physical_pod.metadata.generation = Some(2);
        let physical_client = FakeClient {
            objects: SyncMutex::new(StdHashMap::from([("p1".to_string(), physical_pod)])),
            discovered: vec![pods_resource()],
        };
        let factory = FakeClientFactory {
            client: Arc::new(physical_client),
        };
        let kcp_client = FakeClient::default();

        let mut gates = FeatureGates::all_enabled();
        gates.upstream_sync_conflict_resolution = false;
        let reconciler = Reconciler::new(informer, factory, kcp_client, committer, test_config(), gates);

        reconciler.enqueue(target.key(), Action::Sync).await;
        let item = reconciler.queue.pop().await;
        reconciler.process_one(&item).await.unwrap();

        // First pass creates; a second pass exercises the resolve() path
        // against an existing kcp object and must still just take physical.
        reconciler.queue.done(&item.target_key).await;
        reconciler.enqueue(target.key(), Action::Sync).await;
        let item = reconciler.queue.pop().await;
        reconciler.process_one(&item).await.unwrap();

        assert!(reconciler.recent_conflicts(10).is_empty(), "no-op conflict resolver records no history");
    }

    #[tokio::test]
    async fn disabled_aggregation_gate_does_not_fail_the_reconcile_pass() {
        let target = ready_target("t5");
        let informer = FakeInformer::with(target.clone());
        let committer = FakeCommit::default();

        let mut pod = Object::new("v1", "Pod", "p1");
        pod.metadata.namespace = Some("default".to_string());
        let physical_client = FakeClient {
            objects: SyncMutex::new(StdHashMap::from([("p1".to_string(), pod)])),
            discovered: vec![pods_resource()],
        };
        let factory = FakeClientFactory {
            client: Arc::new(physical_client),
        };
        let kcp_client = FakeClient::default();

        let mut gates = FeatureGates::all_enabled();
        gates.upstream_sync_aggregation = false;
        let reconciler = Reconciler::new(informer, factory, kcp_client, committer, test_config(), gates);

        reconciler.enqueue(target.key(), Action::Sync).await;
        let item = reconciler.queue.pop().await;
        reconciler.process_one(&item).await.unwrap();

        assert_eq!(reconciler.kcp_client.objects.lock().len(), 1, "sync still applies with aggregation disabled");
        assert_eq!(reconciler.committer.calls.lock().len(), 1);
    }
}
