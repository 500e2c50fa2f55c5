use std::sync::Arc;

use fmaster_domain::{GroupId, GroupInfo, GroupState, InstanceInfo, InstanceState, NodeId, RequestId, Signal};
use fmaster_family::InstanceFamilyCache;
use fmaster_signal::{
    ClearGroupRequest, ForwardKillRequest, LocalSchedulerRegistry, SignalRequest, SignalSender,
};
use fmaster_store::MetaStoreClient;
use tracing::warn;
use uuid::Uuid;

use crate::caches::GroupCaches;
use crate::error::GroupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillGroupOutcome {
    /// Every member acknowledged the kill and the group key was deleted.
    Success,
    /// At least one member did not acknowledge; the group key is retained
    /// for a later retry.
    Partial,
}

/// Drives the group lifecycle (§4.E). Masters call every handler below;
/// slaves should only call [`GroupManager::on_group_put`] /
/// [`GroupManager::on_instance_put`] to warm the cache (§4.H).
pub struct GroupManager {
    store: Arc<dyn MetaStoreClient>,
    sender: Arc<dyn SignalSender>,
    registry: Arc<LocalSchedulerRegistry>,
    caches: GroupCaches,
}

impl GroupManager {
    pub fn new(
        store: Arc<dyn MetaStoreClient>,
        sender: Arc<dyn SignalSender>,
        registry: Arc<LocalSchedulerRegistry>,
    ) -> Self {
        Self { store, sender, registry, caches: GroupCaches::new() }
    }

    pub fn caches(&self) -> &GroupCaches {
        &self.caches
    }

    /// Resets every cached index, used on leader demotion (§9).
    pub fn clear(&mut self) {
        self.caches = GroupCaches::new();
    }

    /// `OnGroupPut`: index the group, then check whether its parent instance
    /// is still alive. An absent or FATAL parent terminates the group
    /// immediately.
    pub async fn on_group_put(
        &mut self,
        key: &str,
        info: GroupInfo,
        family: &InstanceFamilyCache,
    ) -> Result<(), GroupError> {
        let group_id = info.group_id.clone();
        self.caches.put(key.to_string(), info.clone());

        if info.parent_id.is_empty() {
            return Ok(());
        }

        let parent = family.get(&info.parent_id);
        let parent_exists = parent.is_some();
        let parent_fatal = parent.as_deref().map(|i| i.state == InstanceState::Fatal).unwrap_or(false);

        if !parent_exists || parent_fatal {
            let signal = if !parent_exists { Signal::ShutDownSignal } else { Signal::GroupExitSignal };
            self.fan_out(&group_id, signal, None, family).await;
            self.store.delete(key).await?;
            self.caches.remove(&group_id);
        }
        Ok(())
    }

    /// Hands a group's ownership to the master itself (§4.D owner hand-over,
    /// run before the fault cascade for a failed node that owned it). The
    /// store write is not best-effort: a failure here must fail the whole
    /// fault-processing step so the reconciler retries it.
    pub async fn hand_over_owner(&mut self, group_id: &GroupId) -> Result<(), GroupError> {
        let Some(mut info) = self.caches.get(group_id).cloned() else { return Ok(()) };
        info.owner_proxy = fmaster_domain::GROUP_MANAGER_OWNER.to_string();
        let Some(key) = self.caches.key_of(group_id).map(str::to_string) else { return Ok(()) };
        self.store.put(&key, serde_json::to_string(&info)?).await?;
        self.caches.put(key, info);
        Ok(())
    }

    /// `OnGroupDelete`: drop the cache entry and best-effort notify the
    /// owner node's local group controller.
    pub async fn on_group_delete(&mut self, group_id: &GroupId) -> Result<(), GroupError> {
        if let Some((_, info)) = self.caches.remove(group_id) {
            let node_id = NodeId::new(info.owner_proxy.clone());
            if self.registry.resolve(&node_id).is_ok() {
                if let Err(err) = self
                    .sender
                    .clear_group(&node_id, ClearGroupRequest { group_id: group_id.clone() })
                    .await
                {
                    warn!(group_id = %group_id, error = %err, "best-effort ClearGroup failed");
                }
            }
        }
        Ok(())
    }

    /// `OnInstancePut`: index `(groupId → instanceId)` for instances that
    /// belong to a group.
    pub fn on_instance_put(&mut self, instance: &InstanceInfo) {
        if let Some(group_id) = &instance.group_id {
            self.caches.add_member(group_id.clone(), instance.instance_id.clone());
        }
    }

    /// `OnInstanceAbnormal`: mark the owning group FAILED and kill the
    /// remaining (non-detached) members.
    pub async fn on_instance_abnormal(
        &mut self,
        instance: &InstanceInfo,
        family: &InstanceFamilyCache,
    ) -> Result<(), GroupError> {
        let Some(group_id) = instance.group_id.clone() else { return Ok(()) };
        let Some(mut info) = self.caches.get(&group_id).cloned() else { return Ok(()) };
        if info.state == GroupState::Failed {
            return Ok(());
        }
        info.state = GroupState::Failed;

        if let Some(key) = self.caches.key_of(&group_id).map(str::to_string) {
            self.store.put(&key, serde_json::to_string(&info)?).await?;
            self.caches.put(key, info);
        }

        self.fan_out(&group_id, Signal::GroupExitSignal, Some(&instance.instance_id), family).await;
        Ok(())
    }

    /// `OnInstanceDelete`: drop the member index entry and, if this instance
    /// parented a `sameRunningLifecycle` group, terminate that group too.
    pub async fn on_instance_delete(&mut self, instance: &InstanceInfo) -> Result<(), GroupError> {
        if let Some(group_id) = &instance.group_id {
            self.caches.remove_member(group_id, &instance.instance_id);
        }

        for group_id in self.caches.groups_parented_by(&instance.instance_id) {
            let same_lifecycle =
                self.caches.get(&group_id).map(|g| g.group_opts.same_running_lifecycle).unwrap_or(false);
            if !same_lifecycle {
                continue;
            }
            if let Some(key) = self.caches.key_of(&group_id).map(str::to_string) {
                self.store.delete(&key).await?;
            }
            self.on_group_delete(&group_id).await?;
        }
        Ok(())
    }

    /// `KillGroup`: fan `SHUT_DOWN_SIGNAL` out to every member; delete the
    /// group key only once every member acknowledged.
    pub async fn kill_group(
        &mut self,
        group_id: &GroupId,
        family: &InstanceFamilyCache,
    ) -> Result<KillGroupOutcome, GroupError> {
        let members = self.caches.members_of(group_id);
        let mut all_acked = true;

        for instance_id in &members {
            let Some(info) = family.get(instance_id) else { continue };
            let node_id = NodeId::new(info.function_proxy_id.clone());
            let Ok(_) = self.registry.resolve(&node_id) else {
                all_acked = false;
                continue;
            };
            let req = ForwardKillRequest {
                request_id: RequestId::new(Uuid::new_v4().to_string()),
                src_instance_id: instance_id.clone(),
                instance_request_id: RequestId::new(Uuid::new_v4().to_string()),
                req: SignalRequest {
                    signal: Signal::ShutDownSignal,
                    instance_id: instance_id.clone(),
                    payload: None,
                },
            };
            match self.sender.forward_kill(&node_id, req).await {
                Ok(resp) if resp.code.is_success() => {}
                _ => all_acked = false,
            }
        }

        if all_acked {
            if let Some(key) = self.caches.key_of(group_id).map(str::to_string) {
                self.store.delete(&key).await?;
            }
            self.caches.remove(group_id);
            Ok(KillGroupOutcome::Success)
        } else {
            Ok(KillGroupOutcome::Partial)
        }
    }

    /// `SyncGroups` (§4.G): diff cache against a metadata snapshot. Every
    /// upstream entry is reapplied via [`Self::on_group_put`] (idempotent,
    /// and catches the absent/FATAL-parent cascade for anything the watch
    /// feed missed); cache-only entries absent upstream are dropped.
    pub async fn sync_groups(
        &mut self,
        upstream: Vec<(String, GroupInfo)>,
        family: &InstanceFamilyCache,
    ) -> Result<(), GroupError> {
        let mut upstream_ids = std::collections::HashSet::new();
        for (key, info) in upstream {
            upstream_ids.insert(info.group_id.clone());
            self.on_group_put(&key, info, family).await?;
        }
        for group_id in self.caches.all_groups() {
            if !upstream_ids.contains(&group_id) {
                self.on_group_delete(&group_id).await?;
            }
        }
        Ok(())
    }

    async fn fan_out(
        &self,
        group_id: &GroupId,
        signal: Signal,
        skip: Option<&fmaster_domain::InstanceId>,
        family: &InstanceFamilyCache,
    ) {
        for instance_id in self.caches.members_of(group_id) {
            if Some(&instance_id) == skip {
                continue;
            }
            let Some(info) = family.get(&instance_id) else { continue };
            if info.detached {
                continue;
            }
            let node_id = NodeId::new(info.function_proxy_id.clone());
            if self.registry.resolve(&node_id).is_err() {
                continue;
            }
            let req = ForwardKillRequest {
                request_id: RequestId::new(Uuid::new_v4().to_string()),
                src_instance_id: instance_id.clone(),
                instance_request_id: RequestId::new(Uuid::new_v4().to_string()),
                req: SignalRequest { signal, instance_id: instance_id.clone(), payload: None },
            };
            if let Err(err) = self.sender.forward_kill(&node_id, req).await {
                warn!(instance_id = %instance_id, error = %err, "group fan-out signal failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmaster_domain::{FunctionId, GroupOpts, InstanceId, InstanceType, JobId};
    use fmaster_signal::LoopbackSignalSender;
    use fmaster_store::InMemoryMetaStore;
    use std::collections::HashMap;

    fn manager() -> (GroupManager, Arc<LocalSchedulerRegistry>) {
        let registry = Arc::new(LocalSchedulerRegistry::new());
        registry.register(NodeId::new("n1"), "10.0.0.1:9000");
        let store = Arc::new(InMemoryMetaStore::new());
        let sender = Arc::new(LoopbackSignalSender::new());
        (GroupManager::new(store, sender, registry.clone()), registry)
    }

    fn make_instance(id: &str, group: Option<&str>, node: &str) -> InstanceInfo {
        InstanceInfo {
            instance_id: InstanceId::new(id),
            request_id: RequestId::new("r"),
            parent_id: InstanceId::new("parent"),
            group_id: group.map(GroupId::new),
            function_proxy_id: node.to_string(),
            function: FunctionId::new("f"),
            job_id: JobId::new("j"),
            state: InstanceState::Running,
            instance_type: InstanceType::Regular,
            detached: false,
            version: 1,
            create_options: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    fn make_group(id: &str, parent: &str) -> GroupInfo {
        GroupInfo {
            group_id: GroupId::new(id),
            owner_proxy: "n1".to_string(),
            parent_id: InstanceId::new(parent),
            state: GroupState::Scheduling,
            group_opts: GroupOpts::default(),
            request_id: RequestId::new("r"),
        }
    }

    #[tokio::test]
    async fn group_terminates_when_parent_absent() {
        let (mut mgr, _registry) = manager();
        let family = InstanceFamilyCache::new();
        mgr.on_group_put("/group/sub/g1", make_group("g1", "ghost-parent"), &family).await.unwrap();
        assert!(!mgr.caches().exists(&GroupId::new("g1")));
    }

    #[tokio::test]
    async fn group_survives_when_parent_healthy() {
        let (mut mgr, _registry) = manager();
        let mut family = InstanceFamilyCache::new();
        family.add(make_instance("parent", None, "n1"));
        mgr.on_group_put("/group/sub/g1", make_group("g1", "parent"), &family).await.unwrap();
        assert!(mgr.caches().exists(&GroupId::new("g1")));
    }

    #[tokio::test]
    async fn instance_abnormal_marks_group_failed() {
        let (mut mgr, _registry) = manager();
        let mut family = InstanceFamilyCache::new();
        family.add(make_instance("parent", None, "n1"));
        mgr.on_group_put("/group/sub/g1", make_group("g1", "parent"), &family).await.unwrap();

        let member = make_instance("i1", Some("g1"), "n1");
        family.add(member.clone());
        mgr.on_instance_put(&member);

        mgr.on_instance_abnormal(&member, &family).await.unwrap();
        assert_eq!(mgr.caches().get(&GroupId::new("g1")).unwrap().state, GroupState::Failed);
    }
}
