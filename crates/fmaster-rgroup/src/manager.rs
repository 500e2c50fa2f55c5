use std::collections::HashMap;
use std::sync::Arc;

use fmaster_domain::{
    key, BundleId, BundleInfo, BundleState, GroupOpts, NodeId, RequestId, ResourceGroupInfo,
    ResourceGroupStatus, TenantId,
};
use fmaster_signal::{LocalSchedulerRegistry, RemoveBundleRequest, SignalSender};
use fmaster_store::MetaStoreClient;
use tracing::warn;

use crate::caches::ResourceGroupCaches;
use crate::error::RgroupError;
use crate::placer::{BundlePlacer, BundleRequest, PlaceBundlesRequest};

#[derive(Debug, Clone)]
pub struct CreateResourceGroupRequest {
    pub name: String,
    pub tenant_id: TenantId,
    pub owner: String,
    pub request_id: RequestId,
    pub group_opts: GroupOpts,
    pub bundles: Vec<BundleRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Failed,
}

/// Drives resource-group/bundle placement and recovery (§4.F).
pub struct ResourceGroupManager {
    store: Arc<dyn MetaStoreClient>,
    sender: Arc<dyn SignalSender>,
    registry: Arc<LocalSchedulerRegistry>,
    placer: Arc<dyn BundlePlacer>,
    caches: ResourceGroupCaches,
}

impl ResourceGroupManager {
    pub fn new(
        store: Arc<dyn MetaStoreClient>,
        sender: Arc<dyn SignalSender>,
        registry: Arc<LocalSchedulerRegistry>,
        placer: Arc<dyn BundlePlacer>,
    ) -> Self {
        Self { store, sender, registry, placer, caches: ResourceGroupCaches::new() }
    }

    pub fn caches(&self) -> &ResourceGroupCaches {
        &self.caches
    }

    /// Resets every cached index, used on leader demotion (§9).
    pub fn clear(&mut self) {
        self.caches = ResourceGroupCaches::new();
    }

    /// `CreateResourceGroup`: mark PENDING, ask the scheduler to place every
    /// bundle, then persist CREATED or FAILED depending on the outcome.
    pub async fn create_resource_group(
        &mut self,
        req: CreateResourceGroupRequest,
    ) -> Result<CreateOutcome, RgroupError> {
        let key = key::resource_group_key(&req.tenant_id, &req.name);
        let mut info = ResourceGroupInfo {
            name: req.name.clone(),
            tenant_id: req.tenant_id.clone(),
            owner: req.owner.clone(),
            request_id: req.request_id.clone(),
            status: ResourceGroupStatus::Pending,
            bundles: vec![],
            group_opts: req.group_opts.clone(),
        };
        self.store.put(&key, serde_json::to_string(&info)?).await?;
        self.caches.put_rgroup(key.clone(), info.clone());

        let placement = self
            .placer
            .place_bundles(PlaceBundlesRequest {
                tenant_id: req.tenant_id.clone(),
                r_group_name: req.name.clone(),
                bundles: req.bundles.clone(),
            })
            .await?;

        let outcome = if placement.code.is_success() {
            let placed: HashMap<BundleId, NodeId> = placement.placements.into_iter().collect();
            let mut bundle_ids = Vec::new();
            for request in &req.bundles {
                let node = placed.get(&request.bundle_id).cloned();
                let bundle = BundleInfo {
                    bundle_id: request.bundle_id.clone(),
                    r_group_name: req.name.clone(),
                    tenant_id: req.tenant_id.clone(),
                    function_proxy_id: node,
                    labels: request.labels.clone(),
                    resources: request.resources.clone(),
                    state: BundleState::Created,
                };
                bundle_ids.push(bundle.bundle_id.clone());
                self.caches.put_bundle(bundle);
            }
            info.status = ResourceGroupStatus::Created;
            info.bundles = bundle_ids;
            CreateOutcome::Created
        } else {
            info.status = ResourceGroupStatus::Failed;
            CreateOutcome::Failed
        };

        self.store.put(&key, serde_json::to_string(&info)?).await?;
        self.caches.put_rgroup(key, info);

        if self.caches.take_queued_delete(&req.name) {
            self.delete_resource_group(&req.name).await?;
        }
        Ok(outcome)
    }

    /// `DeleteResourceGroup`: tear down every bundle on its owning node,
    /// then remove the metadata entry. A delete arriving while the group is
    /// still PENDING is queued instead (§4.F).
    pub async fn delete_resource_group(&mut self, name: &str) -> Result<(), RgroupError> {
        let Some(info) = self.caches.get_rgroup(name).cloned() else { return Ok(()) };

        if info.status == ResourceGroupStatus::Pending {
            self.caches.queue_delete(name.to_string());
            return Ok(());
        }

        for bundle_id in info.bundles.clone() {
            if let Some(bundle) = self.caches.get_bundle(&bundle_id).cloned() {
                if let Some(node_id) = &bundle.function_proxy_id {
                    if self.registry.resolve(node_id).is_ok() {
                        let req = RemoveBundleRequest {
                            r_group_name: name.to_string(),
                            bundle_id: bundle_id.clone(),
                            request_id: info.request_id.clone(),
                        };
                        if let Err(err) = self.sender.remove_bundle(node_id, req).await {
                            warn!(bundle_id = %bundle_id, error = %err, "remove_bundle failed, bundle left stale");
                        }
                    }
                }
                self.caches.remove_bundle(&bundle_id);
            }
        }

        if let Some(key) = self.caches.key_of_rgroup(name).map(str::to_string) {
            self.store.delete(&key).await?;
        }
        self.caches.remove_rgroup(name);
        Ok(())
    }

    /// `OnLocalAbnormal`: reschedule every bundle placed on a failed node.
    pub async fn on_local_abnormal(&mut self, node_id: &NodeId) -> Result<(), RgroupError> {
        let bundle_ids = self.caches.bundles_on_node(node_id);
        for bundle_id in bundle_ids {
            self.reschedule_bundle(&bundle_id).await?;
        }
        Ok(())
    }

    /// `ForwardReportUnitAbnormal`: identical reschedule path, triggered by
    /// a bundle-level health signal instead of a node fault.
    pub async fn forward_report_unit_abnormal(
        &mut self,
        bundle_ids: Vec<BundleId>,
    ) -> Result<(), RgroupError> {
        for bundle_id in bundle_ids {
            self.reschedule_bundle(&bundle_id).await?;
        }
        Ok(())
    }

    async fn reschedule_bundle(&mut self, bundle_id: &BundleId) -> Result<(), RgroupError> {
        let Some(bundle) = self.caches.get_bundle(bundle_id).cloned() else { return Ok(()) };

        match self.placer.reschedule_bundle(&bundle.tenant_id, bundle_id).await {
            Ok(new_node) => {
                self.caches.rebind_bundle(bundle_id, new_node);
                if let Some(info) = self.caches.get_rgroup(&bundle.r_group_name).cloned() {
                    if let Some(key) = self.caches.key_of_rgroup(&bundle.r_group_name).map(str::to_string) {
                        self.store.put(&key, serde_json::to_string(&info)?).await?;
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!(bundle_id = %bundle_id, error = %err, "bundle reschedule failed, will retry next sweep");
                Ok(())
            }
        }
    }

    /// `SyncResourceGroups`: diff cache against an upstream snapshot.
    pub async fn sync_resource_groups(
        &mut self,
        upstream: Vec<(String, ResourceGroupInfo)>,
    ) -> Result<(), RgroupError> {
        let upstream_names: std::collections::HashSet<String> =
            upstream.iter().map(|(_, info)| info.name.clone()).collect();

        for name in self.caches.all_rgroup_names() {
            if !upstream_names.contains(&name) {
                self.caches.remove_rgroup(&name);
            }
        }
        for (key, info) in upstream {
            if self.caches.get_rgroup(&info.name).is_none() {
                self.caches.put_rgroup(key, info);
            }
        }
        Ok(())
    }
}
