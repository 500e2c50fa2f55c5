use std::sync::Mutex;

use async_trait::async_trait;
use fmaster_domain::{ErrorCode, NodeId};

use crate::error::SignalError;
use crate::messages::{
    ClearGroupRequest, ClearGroupResponse, ForwardCustomSignalRequest,
    ForwardCustomSignalResponse, ForwardKillRequest, ForwardKillResponse, KillGroupRequest,
    KillGroupResponse, RemoveBundleRequest, RemoveBundleResponse, RemoveBundleResponseStatus,
};
use crate::sender::SignalSender;

/// Test fake standing in for the RPC transport to local schedulers (mirrors
/// the teacher's local, no-I/O driver stand-in). Always answers with the
/// configured [`ErrorCode`] (default `ErrNone`) and records every call it
/// received for assertions.
#[derive(Debug)]
pub struct LoopbackSignalSender {
    answer: ErrorCode,
    calls: Mutex<Vec<(NodeId, String)>>,
}

impl Default for LoopbackSignalSender {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackSignalSender {
    pub fn new() -> Self {
        Self { answer: ErrorCode::ErrNone, calls: Mutex::new(Vec::new()) }
    }

    pub fn with_answer(answer: ErrorCode) -> Self {
        Self { answer, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(NodeId, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalSender for LoopbackSignalSender {
    async fn forward_custom_signal(
        &self,
        node_id: &NodeId,
        req: ForwardCustomSignalRequest,
    ) -> Result<ForwardCustomSignalResponse, SignalError> {
        self.calls.lock().unwrap().push((node_id.clone(), req.req.signal.to_string()));
        Ok(ForwardCustomSignalResponse {
            request_id: req.request_id,
            code: self.answer,
            message: String::new(),
        })
    }

    async fn forward_kill(
        &self,
        node_id: &NodeId,
        req: ForwardKillRequest,
    ) -> Result<ForwardKillResponse, SignalError> {
        self.forward_custom_signal(node_id, req).await
    }

    async fn kill_group(
        &self,
        node_id: &NodeId,
        req: KillGroupRequest,
    ) -> Result<KillGroupResponse, SignalError> {
        self.calls.lock().unwrap().push((node_id.clone(), "KillGroup".to_string()));
        Ok(KillGroupResponse { group_id: req.group_id, code: self.answer, message: String::new() })
    }

    async fn clear_group(
        &self,
        node_id: &NodeId,
        req: ClearGroupRequest,
    ) -> Result<ClearGroupResponse, SignalError> {
        self.calls.lock().unwrap().push((node_id.clone(), "ClearGroup".to_string()));
        Ok(ClearGroupResponse { group_id: req.group_id, code: self.answer })
    }

    async fn remove_bundle(
        &self,
        node_id: &NodeId,
        req: RemoveBundleRequest,
    ) -> Result<RemoveBundleResponse, SignalError> {
        self.calls.lock().unwrap().push((node_id.clone(), "RemoveBundle".to_string()));
        Ok(RemoveBundleResponse {
            r_group_name: req.r_group_name,
            request_id: req.request_id,
            status: RemoveBundleResponseStatus { code: self.answer },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmaster_domain::{InstanceId, RequestId, Signal};
    use crate::messages::SignalRequest;

    #[tokio::test]
    async fn records_forwarded_signals() {
        let sender = LoopbackSignalSender::new();
        let req = ForwardCustomSignalRequest {
            request_id: RequestId::new("r1"),
            src_instance_id: InstanceId::new("parent"),
            instance_request_id: RequestId::new("r1"),
            req: SignalRequest {
                signal: Signal::ShutDownSignal,
                instance_id: InstanceId::new("child"),
                payload: None,
            },
        };
        let resp = sender.forward_custom_signal(&NodeId::new("n1"), req).await.unwrap();
        assert!(resp.code.is_success());
        assert_eq!(sender.calls().len(), 1);
    }
}
