use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use fmaster_domain::{InstanceId, InstanceInfo, InstanceState};
use tracing::{debug, warn};

/// Per-instance record in the family forest: the current info plus the set
/// of direct children.
#[derive(Debug, Clone)]
pub struct FamilyEntry {
    pub info: Arc<InstanceInfo>,
    pub children: HashSet<InstanceId>,
}

/// In-memory parent→children forest of live instance records (§4.A).
///
/// Single-writer, single-threaded: callers are expected to run this inside
/// one actor/task at a time, matching the "no lock" contract of the
/// original `InstanceFamilyCaches`.
#[derive(Debug)]
pub struct InstanceFamilyCache {
    family: HashMap<InstanceId, FamilyEntry>,
}

fn root_id() -> InstanceId {
    InstanceId::new("")
}

impl Default for InstanceFamilyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceFamilyCache {
    /// Constructs the cache with its dummy root entry already present.
    pub fn new() -> Self {
        let root_info = InstanceInfo {
            instance_id: root_id(),
            request_id: fmaster_domain::RequestId::new(""),
            parent_id: root_id(),
            group_id: None,
            function_proxy_id: String::new(),
            function: fmaster_domain::FunctionId::new(""),
            job_id: fmaster_domain::JobId::new(""),
            state: InstanceState::Running,
            instance_type: fmaster_domain::InstanceType::Regular,
            detached: false,
            version: 0,
            create_options: HashMap::new(),
            extensions: HashMap::new(),
        };
        let mut family = HashMap::new();
        family.insert(
            root_id(),
            FamilyEntry { info: Arc::new(root_info), children: HashSet::new() },
        );
        InstanceFamilyCache { family }
    }

    /// Insert a new entry or, if `instanceId` already present, replace the
    /// `info` pointer only — the cache never re-parents an existing entry.
    pub fn add(&mut self, info: InstanceInfo) {
        let instance_id = info.instance_id.clone();
        let parent_id = info.parent_id.clone();

        if let Some(existing) = self.family.get_mut(&instance_id) {
            debug!(instance_id = %instance_id, "re-adding existing instance, updating info only");
            existing.info = Arc::new(info);
            return;
        }

        let effective_parent = if self.family.contains_key(&parent_id) {
            parent_id
        } else {
            warn!(instance_id = %instance_id, parent_id = %parent_id, "parent not found, attaching under root");
            root_id()
        };

        self.family
            .get_mut(&effective_parent)
            .expect("root always present")
            .children
            .insert(instance_id.clone());

        self.family.insert(
            instance_id,
            FamilyEntry { info: Arc::new(info), children: HashSet::new() },
        );
    }

    /// Detach `instance_id` from its parent, reparent surviving children to
    /// the dummy root, then erase. Idempotent on unknown ids.
    pub fn remove(&mut self, instance_id: &InstanceId) {
        let Some(entry) = self.family.remove(instance_id) else {
            return;
        };

        let root_children = &mut self
            .family
            .get_mut(&root_id())
            .expect("root always present")
            .children;
        for child in &entry.children {
            if self.family.contains_key(child) {
                root_children.insert(child.clone());
            }
        }
        root_children.remove(instance_id);

        if let Some(parent) = self.family.get_mut(&entry.info.parent_id) {
            parent.children.remove(instance_id);
        }
    }

    pub fn exists(&self, instance_id: &InstanceId) -> bool {
        self.family.contains_key(instance_id)
    }

    pub fn get(&self, instance_id: &InstanceId) -> Option<Arc<InstanceInfo>> {
        self.family.get(instance_id).map(|e| e.info.clone())
    }

    /// Strict BFS order, excluding `instance_id` itself. When
    /// `exclude_detached`, detached descendants (and their whole subtree)
    /// are skipped.
    pub fn get_all_descendants_of(
        &self,
        instance_id: &InstanceId,
        exclude_detached: bool,
    ) -> Vec<Arc<InstanceInfo>> {
        let Some(root_entry) = self.family.get(instance_id) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut queue: VecDeque<InstanceId> = VecDeque::new();
        queue.push_back(instance_id.clone());

        while let Some(current_id) = queue.pop_front() {
            let Some(entry) = self.family.get(&current_id) else { continue };
            let mut children: Vec<&InstanceId> = entry.children.iter().collect();
            children.sort();
            for child_id in children {
                let Some(child_entry) = self.family.get(child_id) else { continue };
                if exclude_detached && child_entry.info.detached {
                    continue;
                }
                result.push(child_entry.info.clone());
                queue.push_back(child_id.clone());
            }
        }
        let _ = root_entry;
        result
    }

    /// Bulk seed after a restart, skipping entries whose state is already
    /// terminal (EXITING/EXITED/FATAL) — they're about to be removed by the
    /// normal delete-event flow anyway.
    pub fn sync_all(&mut self, infos: impl IntoIterator<Item = InstanceInfo>) {
        let mut count = 0usize;
        for info in infos {
            if info.state.is_terminal() {
                warn!(instance_id = %info.instance_id, state = %info.state, "skipping unhealthy instance during sync");
                continue;
            }
            count += 1;
            self.family.insert(
                info.instance_id.clone(),
                FamilyEntry { info: Arc::new(info), children: HashSet::new() },
            );
        }
        debug!(count, "synced instances into family cache");
    }

    /// Every non-root entry, in no particular order. Used for full scans
    /// such as "all instances owned by a failed node" (§4.D).
    pub fn all(&self) -> Vec<Arc<InstanceInfo>> {
        self.family
            .iter()
            .filter(|(id, _)| **id != root_id())
            .map(|(_, entry)| entry.info.clone())
            .collect()
    }

    /// Snapshot of the non-root entries. Test-only, mirrors the original's
    /// "should only use for test" `GetFamily`.
    #[doc(hidden)]
    pub fn snapshot_for_test(&self) -> HashMap<InstanceId, FamilyEntry> {
        let mut copy = self.family.clone();
        copy.remove(&root_id());
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmaster_domain::{FunctionId, InstanceType, JobId, RequestId};

    fn make(id: &str, parent: &str, detached: bool) -> InstanceInfo {
        InstanceInfo {
            instance_id: InstanceId::new(id),
            request_id: RequestId::new("r"),
            parent_id: InstanceId::new(parent),
            group_id: None,
            function_proxy_id: "n1".to_string(),
            function: FunctionId::new("f"),
            job_id: JobId::new("j"),
            state: InstanceState::Running,
            instance_type: InstanceType::Regular,
            detached,
            version: 1,
            create_options: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    #[test]
    fn add_without_parent_attaches_to_root() {
        let mut cache = InstanceFamilyCache::new();
        cache.add(make("a", "", false));
        assert!(cache.exists(&InstanceId::new("a")));
        let descendants = cache.get_all_descendants_of(&InstanceId::new(""), true);
        assert_eq!(descendants.len(), 1);
    }

    #[test]
    fn add_with_missing_parent_falls_back_to_root() {
        let mut cache = InstanceFamilyCache::new();
        cache.add(make("orphan", "ghost-parent", false));
        assert!(cache.exists(&InstanceId::new("orphan")));
    }

    #[test]
    fn add_existing_updates_info_without_reparenting() {
        let mut cache = InstanceFamilyCache::new();
        cache.add(make("a", "", false));
        cache.add(make("b", "a", false));

        // Re-add b under a different (bogus) parent — must not move it.
        let mut updated = make("b", "totally-different", false);
        updated.version = 2;
        cache.add(updated);

        let a_descendants = cache.get_all_descendants_of(&InstanceId::new("a"), true);
        assert_eq!(a_descendants.len(), 1);
        assert_eq!(a_descendants[0].instance_id, InstanceId::new("b"));
        assert_eq!(a_descendants[0].version, 2);
    }

    #[test]
    fn remove_reparents_children_to_root() {
        let mut cache = InstanceFamilyCache::new();
        cache.add(make("a", "", false));
        cache.add(make("b", "a", false));
        cache.remove(&InstanceId::new("a"));

        assert!(!cache.exists(&InstanceId::new("a")));
        assert!(cache.exists(&InstanceId::new("b")));
        let root_children = cache.get_all_descendants_of(&InstanceId::new(""), true);
        assert_eq!(root_children.len(), 1);
        assert_eq!(root_children[0].instance_id, InstanceId::new("b"));
    }

    #[test]
    fn remove_unknown_instance_is_noop() {
        let mut cache = InstanceFamilyCache::new();
        cache.remove(&InstanceId::new("never-existed"));
        assert!(!cache.exists(&InstanceId::new("never-existed")));
    }

    #[test]
    fn remove_dummy_root_is_noop() {
        let mut cache = InstanceFamilyCache::new();
        cache.add(make("a", "", false));
        cache.remove(&InstanceId::new(""));
        // root entry stays, "a" stays reachable from it
        assert_eq!(cache.get_all_descendants_of(&InstanceId::new(""), true).len(), 1);
    }

    #[test]
    fn bfs_order_matches_scenario_1() {
        // A←{B,C}; C←{D,E}; D←{F,G}
        let mut cache = InstanceFamilyCache::new();
        cache.add(make("a", "", false));
        cache.add(make("b", "a", false));
        cache.add(make("c", "a", false));
        cache.add(make("d", "c", false));
        cache.add(make("e", "c", false));
        cache.add(make("f", "d", false));
        cache.add(make("g", "d", false));

        let descendants = cache.get_all_descendants_of(&InstanceId::new("a"), true);
        let ids: Vec<String> = descendants.iter().map(|i| i.instance_id.to_string()).collect();
        assert_eq!(ids, vec!["b", "c", "d", "e", "f", "g"]);

        let pos_d = ids.iter().position(|i| i == "d").unwrap();
        let pos_e = ids.iter().position(|i| i == "e").unwrap();
        let pos_f = ids.iter().position(|i| i == "f").unwrap();
        let pos_g = ids.iter().position(|i| i == "g").unwrap();
        assert!(pos_d < pos_f && pos_d < pos_g);
        assert!(pos_e < pos_f && pos_e < pos_g);
    }

    #[test]
    fn excludes_detached_subtree() {
        let mut cache = InstanceFamilyCache::new();
        cache.add(make("c", "", false));
        cache.add(make("d", "c", false));
        cache.add(make("f", "d", true)); // detached
        cache.add(make("g", "f", false)); // under a detached node

        let descendants = cache.get_all_descendants_of(&InstanceId::new("c"), true);
        let ids: Vec<String> = descendants.iter().map(|i| i.instance_id.to_string()).collect();
        assert_eq!(ids, vec!["d"]);
    }

    #[test]
    fn sync_all_skips_terminal_states() {
        let mut cache = InstanceFamilyCache::new();
        let mut healthy = make("a", "", false);
        healthy.state = InstanceState::Running;
        let mut fatal = make("b", "", false);
        fatal.state = InstanceState::Fatal;

        cache.sync_all(vec![healthy, fatal]);
        assert!(cache.exists(&InstanceId::new("a")));
        assert!(!cache.exists(&InstanceId::new("b")));
    }
}
