use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use fmaster_domain::{
    key, request_id, FunctionId, InstanceId, InstanceInfo, InstanceState, NodeId, Signal,
    INSTANCE_MANAGER_OWNER,
};
use fmaster_family::InstanceFamilyCache;
use fmaster_group::{GroupManager, KillGroupOutcome};
use fmaster_signal::{KillRetryEngine, LocalSchedulerRegistry, SignalSender};
use fmaster_store::{AbnormalSchedulerSet, MetaStoreClient, NodeRoster};
use tracing::{debug, warn};

use crate::error::ReconcileError;
use crate::role::LeaderRoleGate;

/// Drives the instance-family lifecycle (§4.D): orphan and FATAL cascades,
/// delete cleanup, and local-scheduler-fault recovery. One controller owns
/// the family cache, the group manager, and the kill-retry engine for a
/// single master election term; under [`crate::role::Role::Slave`] every
/// handler still warms its cache but issues no writes, signals, or
/// reschedules.
pub struct FamilyLifecycleController {
    store: Arc<dyn MetaStoreClient>,
    kill_engine: Arc<KillRetryEngine>,
    registry: Arc<LocalSchedulerRegistry>,
    role: LeaderRoleGate,
    runtime_recover_enable: bool,

    family: InstanceFamilyCache,
    groups: GroupManager,
    roster: NodeRoster,
    abnormal: AbnormalSchedulerSet,
    /// Metadata-store key for each live instance; the family cache only
    /// holds the decoded `InstanceInfo`, not the key it was read from.
    instance_keys: HashMap<InstanceId, String>,
    /// Last accepted request-id sequence per instance, for rejecting
    /// out-of-order reschedule notifies (§6 request-id format).
    last_request_seq: HashMap<InstanceId, u32>,
}

impl FamilyLifecycleController {
    pub fn new(
        store: Arc<dyn MetaStoreClient>,
        sender: Arc<dyn SignalSender>,
        registry: Arc<LocalSchedulerRegistry>,
        role: LeaderRoleGate,
        runtime_recover_enable: bool,
    ) -> Self {
        Self::with_timing(
            store,
            sender,
            registry,
            role,
            runtime_recover_enable,
            fmaster_signal::DEFAULT_RETRY_KILL_INTERVAL,
            fmaster_signal::DEFAULT_KILL_TIMEOUT,
        )
    }

    /// Like [`Self::new`] but with the kill-retry engine's timing drawn from
    /// config (`retryKillIntervalMs`, `g_killTimeout`, §6) rather than
    /// `fmaster_signal`'s built-in defaults.
    pub fn with_timing(
        store: Arc<dyn MetaStoreClient>,
        sender: Arc<dyn SignalSender>,
        registry: Arc<LocalSchedulerRegistry>,
        role: LeaderRoleGate,
        runtime_recover_enable: bool,
        retry_interval: Duration,
        kill_timeout: Duration,
    ) -> Self {
        let kill_engine = Arc::new(KillRetryEngine::with_timing(
            sender.clone(),
            registry.clone(),
            retry_interval,
            kill_timeout,
        ));
        let groups = GroupManager::new(store.clone(), sender, registry.clone());
        Self {
            store,
            kill_engine,
            registry,
            role,
            runtime_recover_enable,
            family: InstanceFamilyCache::new(),
            groups,
            roster: NodeRoster::new(),
            abnormal: AbnormalSchedulerSet::new(),
            instance_keys: HashMap::new(),
            last_request_seq: HashMap::new(),
        }
    }

    pub fn family(&self) -> &InstanceFamilyCache {
        &self.family
    }

    pub fn groups(&self) -> &GroupManager {
        &self.groups
    }

    pub fn roster(&self) -> &NodeRoster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut NodeRoster {
        &mut self.roster
    }

    /// Adds a node to both the roster and the kill-signal registry, keeping
    /// the two in lockstep (§4.I).
    pub fn register_node(&mut self, node_id: NodeId, address: impl Into<String>) {
        self.registry.register(node_id.clone(), address);
        self.roster.add_node(node_id);
    }

    /// Drops a node from the roster and the signal registry; any abnormal
    /// entry for it is shed too (§4.I: "entries are cleaned when the node
    /// is removed from the roster").
    pub fn unregister_node(&mut self, node_id: &NodeId) {
        self.registry.unregister(node_id);
        self.roster.remove_node(node_id);
        self.abnormal.reconcile_against_roster(&self.roster);
    }

    pub fn abnormal(&self) -> &AbnormalSchedulerSet {
        &self.abnormal
    }

    /// Full cache wipe (§9 leader-demotion open question, resolved to the
    /// stricter of the two options): drops every in-memory cache this
    /// controller owns so the next sweep resyncs from scratch.
    pub fn clear(&mut self) {
        self.family = InstanceFamilyCache::new();
        self.groups.clear();
        self.roster = NodeRoster::new();
        self.abnormal = AbnormalSchedulerSet::new();
        self.instance_keys.clear();
        self.last_request_seq.clear();
    }

    /// Presentation-only view for external query responses (§4.I): an
    /// instance whose `functionProxyId` no longer appears in the node
    /// roster is reported as FATAL with a synthetic message, without
    /// mutating or persisting anything.
    pub fn effective_view(&self, info: &InstanceInfo) -> InstanceInfo {
        let mut view = info.clone();
        if !self.roster.contains(&NodeId::new(info.function_proxy_id.clone())) {
            view.function_proxy_id = INSTANCE_MANAGER_OWNER.to_string();
            view.state = InstanceState::Fatal;
        }
        view
    }

    /// `OnInstancePut`: apply a watch/notify event for one instance record.
    /// Masters additionally chase orphan and FATAL cascades; slaves only
    /// warm the family cache and the group index.
    pub async fn on_instance_put(&mut self, key: &str, info: InstanceInfo) -> Result<(), ReconcileError> {
        if let Some(existing) = self.family.get(&info.instance_id) {
            if existing.version > info.version {
                debug!(instance_id = %info.instance_id, "ignoring stale watch event");
                return Ok(());
            }
        }

        self.instance_keys.insert(info.instance_id.clone(), key.to_string());
        self.family.add(info.clone());
        self.groups.on_instance_put(&info);

        if !self.role.is_master() {
            return Ok(());
        }

        if !info.parent_id.is_empty() {
            let parent = self.family.get(&info.parent_id);
            let parent_missing = parent.is_none();
            let parent_fatal =
                parent.as_deref().map(|p| p.state == InstanceState::Fatal).unwrap_or(false);
            if parent_missing || parent_fatal {
                warn!(instance_id = %info.instance_id, "orphaned at insertion, killing and removing");
                self.spawn_kill(&info, Signal::ShutDownSignal);
                self.store.delete(key).await?;
                self.family.remove(&info.instance_id);
                self.instance_keys.remove(&info.instance_id);
                return Ok(());
            }
        }

        if info.state == InstanceState::Fatal {
            self.cascade_fatal(&info).await?;
        }
        Ok(())
    }

    /// Applies a rescheduling notify, discarding it if its request-id
    /// sequence regresses the last one accepted for this instance.
    pub async fn on_reschedule_notify(&mut self, key: &str, info: InstanceInfo) -> Result<(), ReconcileError> {
        if let Some((_, incoming_seq)) = request_id::split(info.request_id.as_str()) {
            let recorded = self.last_request_seq.get(&info.instance_id).copied().unwrap_or(0);
            if request_id::is_stale(recorded, incoming_seq) {
                debug!(instance_id = %info.instance_id, "stale reschedule notify ignored");
                return Ok(());
            }
            self.last_request_seq.insert(info.instance_id.clone(), incoming_seq);
        }
        self.on_instance_put(key, info).await
    }

    /// Cache-only-absent-upstream convergence (§4.G step 3): the metadata
    /// key is already gone, so send a parting SHUT_DOWN_SIGNAL in case the
    /// node missed the original delete, then drop the stale cache entry.
    pub async fn reconcile_stale_instance(&mut self, info: &InstanceInfo) -> Result<(), ReconcileError> {
        self.spawn_kill(info, Signal::ShutDownSignal);
        self.on_instance_delete(info).await
    }

    /// Function-meta deletion (§9 "functionMetaSync" open question,
    /// resolved broadly: every live instance of the deleted function is
    /// torn down, not just `$latest`). Best-effort: kill failures are
    /// logged by the retry engine itself, not propagated here.
    pub async fn on_function_meta_delete(&mut self, function_id: &FunctionId) {
        let affected: Vec<Arc<InstanceInfo>> =
            self.family.all().into_iter().filter(|i| &i.function == function_id).collect();
        for info in affected {
            self.spawn_kill(&info, Signal::ShutDownSignal);
        }
    }

    /// §4.G sync for the group prefix, delegated to the owned
    /// [`GroupManager`] with this controller's family cache as context.
    pub async fn sync_groups(
        &mut self,
        upstream: Vec<(String, fmaster_domain::GroupInfo)>,
    ) -> Result<(), ReconcileError> {
        self.groups.sync_groups(upstream, &self.family).await?;
        Ok(())
    }

    /// `KillGroup` (§4.E, external trigger): kills every live member of the
    /// group through the owned [`GroupManager`], with this controller's
    /// family cache as member context.
    pub async fn kill_group(
        &mut self,
        group_id: &fmaster_domain::GroupId,
    ) -> Result<KillGroupOutcome, ReconcileError> {
        Ok(self.groups.kill_group(group_id, &self.family).await?)
    }

    /// §4.G sync for the abnormal-scheduler prefix: upstream entries are
    /// adopted, cache-only entries absent upstream are dropped. A node
    /// newly reported abnormal fires the fault-recovery cascade exactly
    /// once, on the transition into the set (§4.D "node-abnormal reports").
    pub async fn sync_abnormal_scheduler(
        &mut self,
        upstream_nodes: Vec<NodeId>,
    ) -> Result<(), ReconcileError> {
        let upstream_set: HashSet<NodeId> = upstream_nodes.into_iter().collect();
        let newly_abnormal: Vec<NodeId> =
            upstream_set.iter().filter(|n| !self.abnormal.contains(n)).cloned().collect();

        for node in self.abnormal.snapshot() {
            if !upstream_set.contains(&node) {
                self.abnormal.remove(&node);
            }
        }

        for node in newly_abnormal {
            self.on_local_sched_fault(node).await?;
        }
        Ok(())
    }

    /// `OnInstanceDelete`: forget the instance, resolve any in-flight kill
    /// promise for it, and let the group manager react.
    pub async fn on_instance_delete(&mut self, info: &InstanceInfo) -> Result<(), ReconcileError> {
        self.family.remove(&info.instance_id);
        self.instance_keys.remove(&info.instance_id);
        self.last_request_seq.remove(&info.instance_id);
        self.kill_engine.on_instance_delete(&info.instance_id).await;

        if self.role.is_master() {
            self.groups.on_instance_delete(info).await?;
        }
        Ok(())
    }

    /// The normal FATAL cascade (§4.D): an app-driver that finished
    /// successfully tears its family down in an orderly SHUT_DOWN_SIGNAL;
    /// any other FATAL propagates FAMILY_EXIT_SIGNAL to surviving,
    /// non-detached descendants and fails the owning group.
    async fn cascade_fatal(&mut self, info: &InstanceInfo) -> Result<(), ReconcileError> {
        let signal =
            if info.is_finished_app_driver() { Signal::ShutDownSignal } else { Signal::FamilyExitSignal };

        for child in self.family.get_all_descendants_of(&info.instance_id, true) {
            if child.state.is_terminal() {
                continue;
            }
            self.spawn_kill(&child, signal);
        }

        if !info.is_finished_app_driver() {
            self.groups.on_instance_abnormal(info, &self.family).await?;
        }
        Ok(())
    }

    /// Fire-and-forget kill dispatch: the retry loop runs in its own task so
    /// handlers never block on a slow or unreachable local scheduler.
    fn spawn_kill(&self, info: &InstanceInfo, signal: Signal) {
        let node_id = NodeId::new(info.function_proxy_id.clone());
        let engine = self.kill_engine.clone();
        let instance_id = info.instance_id.clone();
        tokio::spawn(async move {
            engine.kill_instance_with_retry(node_id, instance_id, signal).await;
        });
    }

    /// `OnLocalSchedFault` (§4.D, §4.I): persist the fault exactly once,
    /// hand every group the node owned over to the master, then either
    /// reschedule or fail every instance the node was running.
    pub async fn on_local_sched_fault(&mut self, node_id: NodeId) -> Result<(), ReconcileError> {
        if !self.role.is_master() {
            return Ok(());
        }

        if self.abnormal.insert(node_id.clone()) {
            self.store.put(&key::abnormal_scheduler_key(&node_id), "abnormal".to_string()).await?;
        }

        for group_id in self.groups.caches().groups_on_node(&node_id) {
            // A failed hand-over fails this whole call; the reconciler
            // sweep will retry the fault on the next pass.
            self.groups.hand_over_owner(&group_id).await?;
        }

        let affected: Vec<Arc<InstanceInfo>> =
            self.family.all().into_iter().filter(|i| i.function_proxy_id == node_id.as_str()).collect();

        for info in affected {
            if info.state == InstanceState::Fatal {
                if let Some(key) = self.instance_keys.get(&info.instance_id).cloned() {
                    self.store.delete(&key).await?;
                }
                continue;
            }

            let Some(key) = self.instance_keys.get(&info.instance_id).cloned() else { continue };
            let mut updated = (*info).clone();
            updated.version += 1;

            if self.runtime_recover_enable && info.recover_retry_times() > 0 {
                updated.function_proxy_id = INSTANCE_MANAGER_OWNER.to_string();
                updated.state = InstanceState::Scheduling;
                self.store.put(&key, serde_json::to_string(&updated)?).await?;
                self.family.add(updated);
                // The scheduler's own re-placement arrives as a normal watch
                // event and converges through on_instance_put.
            } else {
                updated.state = InstanceState::Fatal;
                let payload = serde_json::to_string(&updated)?;
                self.store.put(&key, payload).await?;
                self.on_instance_put(&key, updated).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmaster_domain::{
        create_option_keys, FunctionId, GroupId, GroupOpts, GroupState, InstanceType, JobId, RequestId,
        TenantId,
    };
    use fmaster_signal::LoopbackSignalSender;
    use fmaster_store::InMemoryMetaStore;
    use std::collections::HashMap as StdHashMap;

    fn make_instance(id: &str, parent: &str, node: &str, group: Option<&str>) -> InstanceInfo {
        InstanceInfo {
            instance_id: InstanceId::new(id),
            request_id: RequestId::new("r"),
            parent_id: InstanceId::new(parent),
            group_id: group.map(GroupId::new),
            function_proxy_id: node.to_string(),
            function: FunctionId::new("f"),
            job_id: JobId::new("j"),
            state: InstanceState::Running,
            instance_type: InstanceType::Regular,
            detached: false,
            version: 1,
            create_options: StdHashMap::new(),
            extensions: StdHashMap::new(),
        }
    }

    fn controller_master(nodes: Vec<&str>, runtime_recover_enable: bool) -> (FamilyLifecycleController, Arc<LocalSchedulerRegistry>) {
        let store = Arc::new(InMemoryMetaStore::new());
        let sender = Arc::new(LoopbackSignalSender::new());
        let registry = Arc::new(LocalSchedulerRegistry::new());
        for n in &nodes {
            registry.register(NodeId::new(*n), format!("10.0.0.1:{n}"));
        }
        let role = LeaderRoleGate::new(crate::role::Role::Master);
        let ctrl = FamilyLifecycleController::new(store, sender, registry.clone(), role, runtime_recover_enable);
        (ctrl, registry)
    }

    #[tokio::test]
    async fn orphan_at_insertion_is_killed_and_removed() {
        let (mut ctrl, _registry) = controller_master(vec!["n1"], false);
        let orphan = make_instance("i1", "ghost-parent", "n1", None);
        ctrl.on_instance_put("/instance/business/i1", orphan).await.unwrap();
        assert!(!ctrl.family().exists(&InstanceId::new("i1")));
    }

    #[tokio::test]
    async fn fatal_cascades_family_exit_to_descendants() {
        let (mut ctrl, _registry) = controller_master(vec!["n1"], false);
        let root = make_instance("root", "", "n1", None);
        ctrl.on_instance_put("/instance/business/root", root).await.unwrap();
        let child = make_instance("child", "root", "n1", None);
        ctrl.on_instance_put("/instance/business/child", child).await.unwrap();

        let mut fatal_root = make_instance("root", "", "n1", None);
        fatal_root.state = InstanceState::Fatal;
        fatal_root.version = 2;
        ctrl.on_instance_put("/instance/business/root", fatal_root).await.unwrap();

        assert_eq!(ctrl.family().get(&InstanceId::new("root")).unwrap().state, InstanceState::Fatal);
    }

    #[tokio::test]
    async fn finished_app_driver_fatal_is_orderly_shutdown_not_family_exit() {
        let (mut ctrl, _registry) = controller_master(vec!["n1"], false);
        let mut driver = make_instance("driver", "", "n1", None);
        driver.instance_type = InstanceType::AppDriver;
        driver.create_options.insert(create_option_keys::APP_ENTRYPOINT.to_string(), "main.py".to_string());
        ctrl.on_instance_put("/instance/business/driver", driver.clone()).await.unwrap();

        driver.state = InstanceState::Fatal;
        driver.version = 2;
        ctrl.on_instance_put("/instance/business/driver", driver).await.unwrap();
        assert_eq!(ctrl.family().get(&InstanceId::new("driver")).unwrap().state, InstanceState::Fatal);
    }

    #[tokio::test]
    async fn instance_fatal_fails_its_group() {
        let (mut ctrl, _registry) = controller_master(vec!["n1"], false);
        let parent = make_instance("parent", "", "n1", None);
        ctrl.on_instance_put("/instance/business/parent", parent).await.unwrap();

        let group = fmaster_domain::GroupInfo {
            group_id: GroupId::new("g1"),
            owner_proxy: "n1".to_string(),
            parent_id: InstanceId::new("parent"),
            state: GroupState::Scheduling,
            group_opts: GroupOpts::default(),
            request_id: RequestId::new("r"),
        };
        // OnGroupPut is driven by the group-prefix watch sweep, not the
        // instance prefix, so the controller has no entry point of its own
        // for it — reach the group manager directly.
        ctrl.groups.on_group_put("/group/sub/g1", group, &ctrl.family).await.unwrap();

        let mut member = make_instance("i1", "parent", "n1", Some("g1"));
        ctrl.on_instance_put("/instance/business/i1", member.clone()).await.unwrap();
        member.state = InstanceState::Fatal;
        member.version = 2;
        ctrl.on_instance_put("/instance/business/i1", member).await.unwrap();

        assert_eq!(ctrl.groups().caches().get(&GroupId::new("g1")).unwrap().state, GroupState::Failed);
    }

    #[tokio::test]
    async fn local_fault_reschedules_recoverable_instance() {
        let (mut ctrl, _registry) = controller_master(vec!["n1"], true);
        let mut recoverable = make_instance("i1", "", "n1", None);
        recoverable
            .create_options
            .insert(create_option_keys::RECOVER_RETRY_TIMES.to_string(), "2".to_string());
        ctrl.on_instance_put("/instance/business/i1", recoverable).await.unwrap();

        ctrl.on_local_sched_fault(NodeId::new("n1")).await.unwrap();

        let updated = ctrl.family().get(&InstanceId::new("i1")).unwrap();
        assert_eq!(updated.state, InstanceState::Scheduling);
        assert_eq!(updated.function_proxy_id, INSTANCE_MANAGER_OWNER);
    }

    #[tokio::test]
    async fn local_fault_marks_non_recoverable_instance_fatal() {
        let (mut ctrl, _registry) = controller_master(vec!["n1"], true);
        let plain = make_instance("i1", "", "n1", None);
        ctrl.on_instance_put("/instance/business/i1", plain).await.unwrap();

        ctrl.on_local_sched_fault(NodeId::new("n1")).await.unwrap();

        let updated = ctrl.family().get(&InstanceId::new("i1")).unwrap();
        assert_eq!(updated.state, InstanceState::Fatal);
    }

    #[tokio::test]
    async fn local_fault_persists_abnormal_node_exactly_once() {
        let (mut ctrl, _registry) = controller_master(vec!["n1"], false);
        ctrl.on_local_sched_fault(NodeId::new("n1")).await.unwrap();
        ctrl.on_local_sched_fault(NodeId::new("n1")).await.unwrap();
        assert!(ctrl.abnormal().contains(&NodeId::new("n1")));
    }

    #[tokio::test]
    async fn effective_view_reports_fatal_for_node_outside_roster() {
        let (mut ctrl, _registry) = controller_master(vec!["n1"], false);
        let instance = make_instance("i1", "", "n1", None);
        ctrl.on_instance_put("/instance/business/i1", instance.clone()).await.unwrap();
        // n1 never seeded into the roster.
        let view = ctrl.effective_view(&instance);
        assert_eq!(view.state, InstanceState::Fatal);
        assert_eq!(view.function_proxy_id, INSTANCE_MANAGER_OWNER);

        ctrl.roster_mut().add_node(NodeId::new("n1"));
        let view = ctrl.effective_view(&instance);
        assert_eq!(view.state, InstanceState::Running);
    }

    #[tokio::test]
    async fn slave_role_warms_cache_without_side_effects() {
        let store = Arc::new(InMemoryMetaStore::new());
        let sender = Arc::new(LoopbackSignalSender::new());
        let registry = Arc::new(LocalSchedulerRegistry::new());
        registry.register(NodeId::new("n1"), "10.0.0.1:9000");
        let role = LeaderRoleGate::new(crate::role::Role::Slave);
        let mut ctrl = FamilyLifecycleController::new(store, sender, registry, role, false);

        let orphan = make_instance("i1", "ghost-parent", "n1", None);
        ctrl.on_instance_put("/instance/business/i1", orphan).await.unwrap();
        // A slave only warms the cache; it never kills the orphan.
        assert!(ctrl.family().exists(&InstanceId::new("i1")));
    }
}
