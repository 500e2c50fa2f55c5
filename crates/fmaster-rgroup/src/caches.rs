use std::collections::{HashMap, HashSet};

use fmaster_domain::{BundleId, BundleInfo, NodeId, ResourceGroupInfo};

/// Resource-group and bundle indices (§4.F invariants): `resourceGroups[name]`
/// exists iff `bundleInfos[bundleId].rGroupName == name` for every bundle it
/// owns, and `proxyId2BundleIds[nodeId]` is the inverse of each bundle's
/// placement.
#[derive(Debug, Default)]
pub struct ResourceGroupCaches {
    resource_groups: HashMap<String, (String, ResourceGroupInfo)>,
    bundles: HashMap<BundleId, BundleInfo>,
    proxy_to_bundles: HashMap<NodeId, HashSet<BundleId>>,
    /// Resource-group names with a delete request queued because the group
    /// was still PENDING creation when the delete arrived (§4.F).
    pending_deletes: HashSet<String>,
}

impl ResourceGroupCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_rgroup(&mut self, key: impl Into<String>, info: ResourceGroupInfo) {
        self.resource_groups.insert(info.name.clone(), (key.into(), info));
    }

    pub fn remove_rgroup(&mut self, name: &str) -> Option<(String, ResourceGroupInfo)> {
        self.pending_deletes.remove(name);
        self.resource_groups.remove(name)
    }

    pub fn get_rgroup(&self, name: &str) -> Option<&ResourceGroupInfo> {
        self.resource_groups.get(name).map(|(_, info)| info)
    }

    pub fn key_of_rgroup(&self, name: &str) -> Option<&str> {
        self.resource_groups.get(name).map(|(key, _)| key.as_str())
    }

    pub fn all_rgroup_names(&self) -> Vec<String> {
        self.resource_groups.keys().cloned().collect()
    }

    pub fn queue_delete(&mut self, name: impl Into<String>) {
        self.pending_deletes.insert(name.into());
    }

    /// Returns `true` (and clears the flag) if a delete was queued for
    /// `name` while it was still being created.
    pub fn take_queued_delete(&mut self, name: &str) -> bool {
        self.pending_deletes.remove(name)
    }

    pub fn put_bundle(&mut self, bundle: BundleInfo) {
        if let Some(node) = &bundle.function_proxy_id {
            self.proxy_to_bundles.entry(node.clone()).or_default().insert(bundle.bundle_id.clone());
        }
        self.bundles.insert(bundle.bundle_id.clone(), bundle);
    }

    pub fn remove_bundle(&mut self, bundle_id: &BundleId) -> Option<BundleInfo> {
        let removed = self.bundles.remove(bundle_id);
        if let Some(bundle) = &removed {
            if let Some(node) = &bundle.function_proxy_id {
                if let Some(set) = self.proxy_to_bundles.get_mut(node) {
                    set.remove(bundle_id);
                }
            }
        }
        removed
    }

    pub fn get_bundle(&self, bundle_id: &BundleId) -> Option<&BundleInfo> {
        self.bundles.get(bundle_id)
    }

    pub fn bundles_on_node(&self, node_id: &NodeId) -> Vec<BundleId> {
        self.proxy_to_bundles.get(node_id).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    /// Update a bundle's node placement, re-keying the inverse index.
    pub fn rebind_bundle(&mut self, bundle_id: &BundleId, new_node: NodeId) {
        if let Some(bundle) = self.bundles.get_mut(bundle_id) {
            if let Some(old_node) = bundle.function_proxy_id.replace(new_node.clone()) {
                if let Some(set) = self.proxy_to_bundles.get_mut(&old_node) {
                    set.remove(bundle_id);
                }
            }
            self.proxy_to_bundles.entry(new_node).or_default().insert(bundle_id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmaster_domain::{BundleState, TenantId};
    use std::collections::HashMap as StdHashMap;

    fn bundle(id: &str, node: Option<&str>) -> BundleInfo {
        BundleInfo {
            bundle_id: BundleId::new(id),
            r_group_name: "rg1".to_string(),
            tenant_id: TenantId::new("t1"),
            function_proxy_id: node.map(NodeId::new),
            labels: StdHashMap::new(),
            resources: StdHashMap::new(),
            state: if node.is_some() { BundleState::Created } else { BundleState::Pending },
        }
    }

    #[test]
    fn inverse_index_tracks_placement() {
        let mut caches = ResourceGroupCaches::new();
        caches.put_bundle(bundle("b1", Some("n1")));
        assert_eq!(caches.bundles_on_node(&NodeId::new("n1")), vec![BundleId::new("b1")]);
    }

    #[test]
    fn rebind_moves_between_node_indices() {
        let mut caches = ResourceGroupCaches::new();
        caches.put_bundle(bundle("b1", Some("n1")));
        caches.rebind_bundle(&BundleId::new("b1"), NodeId::new("n2"));
        assert!(caches.bundles_on_node(&NodeId::new("n1")).is_empty());
        assert_eq!(caches.bundles_on_node(&NodeId::new("n2")), vec![BundleId::new("b1")]);
    }

    #[test]
    fn queued_delete_is_one_shot() {
        let mut caches = ResourceGroupCaches::new();
        caches.queue_delete("rg1");
        assert!(caches.take_queued_delete("rg1"));
        assert!(!caches.take_queued_delete("rg1"));
    }
}
