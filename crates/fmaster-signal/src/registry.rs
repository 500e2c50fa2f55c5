use std::collections::HashMap;
use std::sync::RwLock;

use fmaster_domain::NodeId;

use crate::error::SignalError;

/// Resolves a node id to the address its local scheduler's instance
/// controller actor listens on (§4.C, §4.I).
#[derive(Debug, Default)]
pub struct LocalSchedulerRegistry {
    addresses: RwLock<HashMap<NodeId, String>>,
}

impl LocalSchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, node_id: NodeId, address: impl Into<String>) {
        self.addresses.write().unwrap().insert(node_id, address.into());
    }

    pub fn unregister(&self, node_id: &NodeId) {
        self.addresses.write().unwrap().remove(node_id);
    }

    pub fn resolve(&self, node_id: &NodeId) -> Result<String, SignalError> {
        self.addresses
            .read()
            .unwrap()
            .get(node_id)
            .cloned()
            .ok_or_else(|| SignalError::NodeUnresolved(node_id.to_string()))
    }

    /// The fully qualified actor address a signal is addressed to.
    pub fn actor_address(&self, node_id: &NodeId) -> Result<String, SignalError> {
        let address = self.resolve(node_id)?;
        Ok(format!("{node_id}-LocalSchedInstanceCtrlActor@{address}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_node() {
        let registry = LocalSchedulerRegistry::new();
        registry.register(NodeId::new("n1"), "10.0.0.1:9000");
        assert_eq!(registry.resolve(&NodeId::new("n1")).unwrap(), "10.0.0.1:9000");
    }

    #[test]
    fn unresolved_node_is_an_error() {
        let registry = LocalSchedulerRegistry::new();
        assert!(matches!(
            registry.resolve(&NodeId::new("ghost")),
            Err(SignalError::NodeUnresolved(_))
        ));
    }

    #[test]
    fn actor_address_has_expected_shape() {
        let registry = LocalSchedulerRegistry::new();
        registry.register(NodeId::new("n1"), "10.0.0.1:9000");
        assert_eq!(
            registry.actor_address(&NodeId::new("n1")).unwrap(),
            "n1-LocalSchedInstanceCtrlActor@10.0.0.1:9000"
        );
    }
}
