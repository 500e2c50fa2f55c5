use fmaster_domain::{ErrorCode, GroupId, InstanceId, RequestId, Signal};
use serde::{Deserialize, Serialize};

/// The inner payload of a `ForwardCustomSignalRequest` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRequest {
    pub signal: Signal,
    pub instance_id: InstanceId,
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardCustomSignalRequest {
    pub request_id: RequestId,
    pub src_instance_id: InstanceId,
    pub instance_request_id: RequestId,
    pub req: SignalRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardCustomSignalResponse {
    pub request_id: RequestId,
    pub code: ErrorCode,
    pub message: String,
}

/// Same shape as [`ForwardCustomSignalRequest`]; used for kill-group and
/// kill-all flows (§6).
pub type ForwardKillRequest = ForwardCustomSignalRequest;
pub type ForwardKillResponse = ForwardCustomSignalResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillGroupRequest {
    pub group_id: GroupId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillGroupResponse {
    pub group_id: GroupId,
    pub code: ErrorCode,
    pub message: String,
}

/// Best-effort notification to a node's local group controller actor that a
/// group has been torn down master-side (§4.E `OnGroupDelete`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearGroupRequest {
    pub group_id: GroupId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearGroupResponse {
    pub group_id: GroupId,
    pub code: ErrorCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBundleRequest {
    pub r_group_name: String,
    pub bundle_id: fmaster_domain::BundleId,
    pub request_id: RequestId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBundleResponseStatus {
    pub code: ErrorCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBundleResponse {
    pub r_group_name: String,
    pub request_id: RequestId,
    pub status: RemoveBundleResponseStatus,
}
