use std::sync::Arc;

use async_trait::async_trait;
use fmaster_domain::NodeId;

use crate::error::SignalError;

/// One entry from the scheduler's node directory (§4.I `QueryNodes()`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub node_id: NodeId,
    pub address: String,
}

/// Stands in for the scheduler's `QueryNodes()` RPC (§4.I): the
/// authoritative node list the master seeds its roster and local-scheduler
/// registry from, and re-polls every sweep to pick up membership changes.
#[async_trait]
pub trait SchedulerDirectory: Send + Sync + 'static {
    async fn query_nodes(&self) -> Result<Vec<NodeDescriptor>, SignalError>;
}

/// A fixed node list read from startup config. Swap for a real client
/// against the scheduler's discovery service when one exists.
#[derive(Debug, Clone, Default)]
pub struct StaticSchedulerDirectory {
    nodes: Arc<Vec<NodeDescriptor>>,
}

impl StaticSchedulerDirectory {
    pub fn new(nodes: impl IntoIterator<Item = (String, String)>) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|(id, address)| NodeDescriptor { node_id: NodeId::new(id), address })
            .collect();
        Self { nodes: Arc::new(nodes) }
    }
}

#[async_trait]
impl SchedulerDirectory for StaticSchedulerDirectory {
    async fn query_nodes(&self) -> Result<Vec<NodeDescriptor>, SignalError> {
        Ok((*self.nodes).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_nodes() {
        let dir =
            StaticSchedulerDirectory::new(vec![("n1".to_string(), "10.0.0.1:9000".to_string())]);
        let nodes = dir.query_nodes().await.unwrap();
        assert_eq!(
            nodes,
            vec![NodeDescriptor { node_id: NodeId::new("n1"), address: "10.0.0.1:9000".to_string() }]
        );
    }

    #[tokio::test]
    async fn empty_directory_returns_no_nodes() {
        let dir = StaticSchedulerDirectory::new(Vec::new());
        assert!(dir.query_nodes().await.unwrap().is_empty());
    }
}
