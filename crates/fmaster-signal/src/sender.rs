use async_trait::async_trait;
use fmaster_domain::NodeId;

use crate::error::SignalError;
use crate::messages::{
    ClearGroupRequest, ClearGroupResponse, ForwardCustomSignalRequest,
    ForwardCustomSignalResponse, ForwardKillRequest, ForwardKillResponse, KillGroupRequest,
    KillGroupResponse, RemoveBundleRequest, RemoveBundleResponse,
};

/// RPC surface exposed by a local scheduler's instance controller actor
/// (`<nodeId>-LocalSchedInstanceCtrlActor@<address>`, §4.C). This is the
/// signal/kill propagation protocol the controller speaks to remote peers;
/// the transport itself (the RPC framework) is an external collaborator.
#[async_trait]
pub trait SignalSender: Send + Sync + 'static {
    async fn forward_custom_signal(
        &self,
        node_id: &NodeId,
        req: ForwardCustomSignalRequest,
    ) -> Result<ForwardCustomSignalResponse, SignalError>;

    async fn forward_kill(
        &self,
        node_id: &NodeId,
        req: ForwardKillRequest,
    ) -> Result<ForwardKillResponse, SignalError>;

    async fn kill_group(
        &self,
        node_id: &NodeId,
        req: KillGroupRequest,
    ) -> Result<KillGroupResponse, SignalError>;

    /// Best-effort: a transport error here is logged and ignored by callers.
    async fn clear_group(
        &self,
        node_id: &NodeId,
        req: ClearGroupRequest,
    ) -> Result<ClearGroupResponse, SignalError>;

    async fn remove_bundle(
        &self,
        node_id: &NodeId,
        req: RemoveBundleRequest,
    ) -> Result<RemoveBundleResponse, SignalError>;
}
