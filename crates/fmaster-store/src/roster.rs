use std::collections::HashSet;

use fmaster_domain::NodeId;

/// Authoritative node membership (§4.I), seeded from the scheduler's
/// `QueryNodes()` at startup and kept current via add/delete callbacks.
#[derive(Debug, Default)]
pub struct NodeRoster {
    nodes: HashSet<NodeId>,
}

impl NodeRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        self.nodes = nodes.into_iter().collect();
    }

    pub fn add_node(&mut self, node_id: NodeId) {
        self.nodes.insert(node_id);
    }

    /// Returns `true` if the node was present and is now removed.
    pub fn remove_node(&mut self, node_id: &NodeId) -> bool {
        self.nodes.remove(node_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn snapshot(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.nodes.iter().cloned().collect();
        nodes.sort();
        nodes
    }
}

/// Durable set of nodes currently known-unreachable, persisted under
/// `/abnormal/localscheduler/<nodeId>` so a master restart resumes recovery
/// where it left off (§4.I).
#[derive(Debug, Default)]
pub struct AbnormalSchedulerSet {
    nodes: HashSet<NodeId>,
}

impl AbnormalSchedulerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `node_id` abnormal. Returns `true` only the first time a given
    /// node is marked, so a caller issuing concurrent fault reports persists
    /// exactly one metadata write per node (§8 boundary).
    pub fn insert(&mut self, node_id: NodeId) -> bool {
        self.nodes.insert(node_id)
    }

    pub fn remove(&mut self, node_id: &NodeId) -> bool {
        self.nodes.remove(node_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn snapshot(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.nodes.iter().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Drops any abnormal-scheduler entry for a node no longer in `roster`
    /// (§4.I: "entries are cleaned when the node is removed from the roster").
    pub fn reconcile_against_roster(&mut self, roster: &NodeRoster) {
        self.nodes.retain(|n| roster.contains(n));
    }
}
