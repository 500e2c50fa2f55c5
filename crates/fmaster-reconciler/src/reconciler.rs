use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fmaster_domain::{key, FunctionId, GroupInfo, InstanceInfo, NodeId, ResourceGroupInfo};
use fmaster_rgroup::ResourceGroupManager;
use fmaster_signal::SchedulerDirectory;
use fmaster_store::{MetaStoreClient, MetaStoreOperateCacher};
use tokio::sync::{watch, Mutex};
use tracing::warn;

use crate::controller::FamilyLifecycleController;
use crate::error::ReconcileError;
use crate::role::LeaderRoleGate;

/// Default interval between reconciliation sweeps (§4.G).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Periodic drift-resolution loop (§4.G). Holds `Arc` handles to the same
/// controller/resource-group manager the API layer serves queries from, so
/// a sweep and an inbound request can interleave safely.
pub struct WatchSyncReconciler {
    store: Arc<dyn MetaStoreClient>,
    controller: Arc<Mutex<FamilyLifecycleController>>,
    rgroups: Arc<Mutex<ResourceGroupManager>>,
    role: LeaderRoleGate,
    interval: Duration,
    /// Stands in for the scheduler's `QueryNodes()` (§4.I); polled once a
    /// sweep and diffed against the roster to seed and maintain it.
    directory: Arc<dyn SchedulerDirectory>,
    /// Buffered writes from callers that couldn't reach the store directly;
    /// replayed against it at the start of every sweep (§4.G step 2).
    cacher: MetaStoreOperateCacher,
    known_function_meta_keys: HashSet<String>,
}

impl WatchSyncReconciler {
    pub fn new(
        store: Arc<dyn MetaStoreClient>,
        controller: Arc<Mutex<FamilyLifecycleController>>,
        rgroups: Arc<Mutex<ResourceGroupManager>>,
        role: LeaderRoleGate,
        directory: Arc<dyn SchedulerDirectory>,
    ) -> Self {
        Self::with_interval(store, controller, rgroups, role, directory, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_interval(
        store: Arc<dyn MetaStoreClient>,
        controller: Arc<Mutex<FamilyLifecycleController>>,
        rgroups: Arc<Mutex<ResourceGroupManager>>,
        role: LeaderRoleGate,
        directory: Arc<dyn SchedulerDirectory>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            controller,
            rgroups,
            role,
            interval,
            directory,
            cacher: MetaStoreOperateCacher::new(),
            known_function_meta_keys: HashSet::new(),
        }
    }

    pub fn cacher_mut(&mut self) -> &mut MetaStoreOperateCacher {
        &mut self.cacher
    }

    /// Ticks every `sync_*` at `self.interval` until `shutdown` reports
    /// `true`. A demotion to [`crate::role::Role::Slave`] wipes every cache
    /// clean before the next sweep (§9, resolved to the stricter of the two
    /// open options: a full wipe over watch-revision bookkeeping).
    pub async fn run_forever(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        let mut last_role = self.role.current();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = ticker.tick() => {
                    let current_role = self.role.current();
                    if current_role != last_role && current_role == crate::role::Role::Slave {
                        self.wipe_caches().await;
                    }
                    last_role = current_role;
                    self.sweep_all().await;
                }
            }
        }
    }

    async fn wipe_caches(&mut self) {
        warn!("demoted to slave, wiping reconciler caches");
        self.controller.lock().await.clear();
        self.rgroups.lock().await.clear();
        self.known_function_meta_keys.clear();
    }

    /// Runs every prefix sweep once, logging and continuing past a failure
    /// in any one of them rather than aborting the whole round.
    pub async fn sweep_all(&mut self) {
        if let Err(err) = self.sync_nodes().await {
            warn!(error = %err, "node-directory sweep failed, will retry next tick");
        }
        if let Err(err) = self.sync_instance().await {
            warn!(error = %err, "instance sweep failed, will retry next tick");
        }
        if let Err(err) = self.sync_group().await {
            warn!(error = %err, "group sweep failed, will retry next tick");
        }
        self.sync_function_meta().await;
        if let Err(err) = self.sync_abnormal_scheduler().await {
            warn!(error = %err, "abnormal-scheduler sweep failed, will retry next tick");
        }
        if let Err(err) = self.sync_resource_group().await {
            warn!(error = %err, "resource-group sweep failed, will retry next tick");
        }
    }

    /// Polls the scheduler's node directory and diffs it against the
    /// roster, registering newly-seen nodes and dropping ones that vanished
    /// (§4.I: "seeded from `QueryNodes()` at init", approximated here by
    /// every sweep rather than a push callback).
    async fn sync_nodes(&mut self) -> Result<(), ReconcileError> {
        let nodes = self.directory.query_nodes().await?;
        let upstream: HashSet<NodeId> = nodes.iter().map(|n| n.node_id.clone()).collect();

        let mut controller = self.controller.lock().await;
        let current: HashSet<NodeId> = controller.roster().snapshot().into_iter().collect();

        for desc in nodes {
            if !current.contains(&desc.node_id) {
                controller.register_node(desc.node_id, desc.address);
            }
        }
        for node_id in current.difference(&upstream) {
            controller.unregister_node(node_id);
        }
        Ok(())
    }

    async fn replay_buffered(&mut self, prefix: &str) -> Result<(), ReconcileError> {
        let (puts, deletes) = self.cacher.drain(prefix);
        for (k, v) in puts {
            self.store.put(&k, v).await?;
        }
        for k in deletes {
            self.store.delete(&k).await?;
        }
        Ok(())
    }

    async fn sync_instance(&mut self) -> Result<(), ReconcileError> {
        self.replay_buffered(key::INSTANCE_PREFIX).await?;
        let upstream = self.store.list(key::INSTANCE_PREFIX).await?;

        let mut controller = self.controller.lock().await;
        let mut upstream_ids = HashSet::new();
        for entry in &upstream {
            let info: InstanceInfo = serde_json::from_str(&entry.value)?;
            upstream_ids.insert(info.instance_id.clone());
            let needs_apply = match controller.family().get(&info.instance_id) {
                Some(cached) => cached.version < info.version,
                None => true,
            };
            if needs_apply {
                controller.on_reschedule_notify(&entry.key, info).await?;
            }
        }

        let stale: Vec<Arc<InstanceInfo>> = controller
            .family()
            .all()
            .into_iter()
            .filter(|i| !upstream_ids.contains(&i.instance_id))
            .collect();
        for info in stale {
            controller.reconcile_stale_instance(&info).await?;
        }
        Ok(())
    }

    async fn sync_group(&mut self) -> Result<(), ReconcileError> {
        self.replay_buffered(key::GROUP_PREFIX).await?;
        let upstream = self.store.list(key::GROUP_PREFIX).await?;
        let decoded: Result<Vec<(String, GroupInfo)>, _> = upstream
            .into_iter()
            .map(|e| serde_json::from_str::<GroupInfo>(&e.value).map(|info| (e.key, info)))
            .collect();
        let decoded = decoded?;

        let mut controller = self.controller.lock().await;
        controller.sync_groups(decoded).await
    }

    async fn sync_function_meta(&mut self) {
        let upstream = match self.store.list(key::FUNCTION_META_PREFIX).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "function-meta sweep failed, will retry next tick");
                return;
            }
        };
        let upstream_keys: HashSet<String> = upstream.into_iter().map(|e| e.key).collect();

        let deleted: Vec<String> =
            self.known_function_meta_keys.difference(&upstream_keys).cloned().collect();
        if !deleted.is_empty() {
            let mut controller = self.controller.lock().await;
            for k in &deleted {
                let function_id = FunctionId::new(key::trailing_id(k));
                controller.on_function_meta_delete(&function_id).await;
            }
        }
        self.known_function_meta_keys = upstream_keys;
    }

    async fn sync_abnormal_scheduler(&mut self) -> Result<(), ReconcileError> {
        let upstream = self.store.list(key::ABNORMAL_SCHEDULER_PREFIX).await?;
        let nodes: Vec<NodeId> = upstream.iter().map(|e| NodeId::new(key::trailing_id(&e.key))).collect();
        self.controller.lock().await.sync_abnormal_scheduler(nodes).await
    }

    async fn sync_resource_group(&mut self) -> Result<(), ReconcileError> {
        self.replay_buffered(key::RESOURCE_GROUP_PREFIX).await?;
        let upstream = self.store.list(key::RESOURCE_GROUP_PREFIX).await?;
        let decoded: Result<Vec<(String, ResourceGroupInfo)>, _> = upstream
            .into_iter()
            .map(|e| serde_json::from_str::<ResourceGroupInfo>(&e.value).map(|info| (e.key, info)))
            .collect();
        let decoded = decoded?;

        let mut rgroups = self.rgroups.lock().await;
        rgroups.sync_resource_groups(decoded).await?;
        Ok(())
    }
}
