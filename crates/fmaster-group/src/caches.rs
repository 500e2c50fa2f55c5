use std::collections::{HashMap, HashSet};

use fmaster_domain::{GroupId, GroupInfo, InstanceId, NodeId, GROUP_MANAGER_OWNER};

/// The four group indices named in §3: `groupId→(metaKey, info)`,
/// `nodeId→set<groupId>`, `parentInstanceId→set<groupId>`,
/// `groupId→set<instanceId>` (members).
#[derive(Debug, Default)]
pub struct GroupCaches {
    groups: HashMap<GroupId, (String, GroupInfo)>,
    by_node: HashMap<NodeId, HashSet<GroupId>>,
    by_parent: HashMap<InstanceId, HashSet<GroupId>>,
    members: HashMap<GroupId, HashSet<InstanceId>>,
}

impl GroupCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, info: GroupInfo) {
        let group_id = info.group_id.clone();
        self.remove_from_secondary_indices(&group_id);

        if info.owner_proxy != GROUP_MANAGER_OWNER {
            self.by_node
                .entry(NodeId::new(info.owner_proxy.clone()))
                .or_default()
                .insert(group_id.clone());
        }
        if !info.parent_id.is_empty() {
            self.by_parent.entry(info.parent_id.clone()).or_default().insert(group_id.clone());
        }

        self.groups.insert(group_id, (key.into(), info));
    }

    pub fn remove(&mut self, group_id: &GroupId) -> Option<(String, GroupInfo)> {
        self.remove_from_secondary_indices(group_id);
        self.members.remove(group_id);
        self.groups.remove(group_id)
    }

    fn remove_from_secondary_indices(&mut self, group_id: &GroupId) {
        for set in self.by_node.values_mut() {
            set.remove(group_id);
        }
        for set in self.by_parent.values_mut() {
            set.remove(group_id);
        }
    }

    pub fn get(&self, group_id: &GroupId) -> Option<&GroupInfo> {
        self.groups.get(group_id).map(|(_, info)| info)
    }

    pub fn key_of(&self, group_id: &GroupId) -> Option<&str> {
        self.groups.get(group_id).map(|(key, _)| key.as_str())
    }

    pub fn exists(&self, group_id: &GroupId) -> bool {
        self.groups.contains_key(group_id)
    }

    pub fn groups_parented_by(&self, instance_id: &InstanceId) -> Vec<GroupId> {
        self.by_parent.get(instance_id).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn groups_on_node(&self, node_id: &NodeId) -> Vec<GroupId> {
        self.by_node.get(node_id).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn add_member(&mut self, group_id: GroupId, instance_id: InstanceId) {
        self.members.entry(group_id).or_default().insert(instance_id);
    }

    pub fn remove_member(&mut self, group_id: &GroupId, instance_id: &InstanceId) {
        if let Some(set) = self.members.get_mut(group_id) {
            set.remove(instance_id);
        }
    }

    pub fn members_of(&self, group_id: &GroupId) -> Vec<InstanceId> {
        self.members.get(group_id).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn all_groups(&self) -> Vec<GroupId> {
        self.groups.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmaster_domain::{GroupOpts, GroupState, InstanceId, RequestId};

    fn group(id: &str, owner: &str, parent: &str) -> GroupInfo {
        GroupInfo {
            group_id: GroupId::new(id),
            owner_proxy: owner.to_string(),
            parent_id: InstanceId::new(parent),
            state: GroupState::Scheduling,
            group_opts: GroupOpts::default(),
            request_id: RequestId::new("r"),
        }
    }

    #[test]
    fn put_indexes_by_node_and_parent() {
        let mut caches = GroupCaches::new();
        caches.put("/group/sub/g1", group("g1", "n1", "parent1"));
        assert!(caches.exists(&GroupId::new("g1")));
        assert_eq!(caches.groups_parented_by(&InstanceId::new("parent1")), vec![GroupId::new("g1")]);
    }

    #[test]
    fn remove_clears_all_indices() {
        let mut caches = GroupCaches::new();
        caches.put("/group/sub/g1", group("g1", "n1", "parent1"));
        caches.add_member(GroupId::new("g1"), InstanceId::new("i1"));
        caches.remove(&GroupId::new("g1"));

        assert!(!caches.exists(&GroupId::new("g1")));
        assert!(caches.groups_parented_by(&InstanceId::new("parent1")).is_empty());
        assert!(caches.members_of(&GroupId::new("g1")).is_empty());
    }
}
