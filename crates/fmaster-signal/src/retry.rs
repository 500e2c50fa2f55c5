use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fmaster_domain::{ErrorCode, InstanceId, NodeId, RequestId, Signal};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::messages::{ForwardCustomSignalRequest, SignalRequest};
use crate::registry::LocalSchedulerRegistry;
use crate::sender::SignalSender;

/// Default retry interval for a failed kill attempt (§4.C).
pub const DEFAULT_RETRY_KILL_INTERVAL: Duration = Duration::from_secs(15);
/// Default per-attempt timeout for non-synchronous kill signals (§5).
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(30);

/// Terminal outcome of a kill-with-retry call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// The target acknowledged the kill, or a pending promise was resolved
    /// because the controller observed the instance's deletion.
    Success,
    /// The target reported the instance was already gone; callers should
    /// force-delete the stale metadata record.
    InstanceNotFound,
}

enum Attempt {
    Success,
    NotFound,
    Retry,
}

struct PromiseSlot {
    instance_id: InstanceId,
    tx: oneshot::Sender<ErrorCode>,
}

/// Sends `ForwardCustomSignal` to the local controller owning an instance
/// and retries on failure (§4.C). One engine instance is shared by the
/// controller actor that owns the family cache.
pub struct KillRetryEngine {
    sender: Arc<dyn SignalSender>,
    registry: Arc<LocalSchedulerRegistry>,
    retry_interval: Duration,
    kill_timeout: Duration,
    promises: Mutex<HashMap<Uuid, PromiseSlot>>,
}

impl KillRetryEngine {
    pub fn new(sender: Arc<dyn SignalSender>, registry: Arc<LocalSchedulerRegistry>) -> Self {
        Self::with_timing(sender, registry, DEFAULT_RETRY_KILL_INTERVAL, DEFAULT_KILL_TIMEOUT)
    }

    pub fn with_timing(
        sender: Arc<dyn SignalSender>,
        registry: Arc<LocalSchedulerRegistry>,
        retry_interval: Duration,
        kill_timeout: Duration,
    ) -> Self {
        Self { sender, registry, retry_interval, kill_timeout, promises: Mutex::new(HashMap::new()) }
    }

    /// Resolves every outstanding promise for `instance_id` with OK and
    /// cancels their retry loops — called once the controller observes the
    /// instance's deletion watch event (§4.C step 5).
    pub async fn on_instance_delete(&self, instance_id: &InstanceId) {
        let mut guard = self.promises.lock().await;
        let slots: Vec<Uuid> = guard
            .iter()
            .filter(|(_, slot)| &slot.instance_id == instance_id)
            .map(|(id, _)| *id)
            .collect();
        for slot_id in slots {
            if let Some(slot) = guard.remove(&slot_id) {
                // Resolving twice is impossible since the slot is removed;
                // a closed receiver (already resolved locally) is silently discarded.
                let _ = slot.tx.send(ErrorCode::ErrNone);
            }
        }
    }

    async fn register(&self, instance_id: InstanceId) -> (Uuid, oneshot::Receiver<ErrorCode>) {
        let (tx, rx) = oneshot::channel();
        let slot_id = Uuid::new_v4();
        self.promises.lock().await.insert(slot_id, PromiseSlot { instance_id, tx });
        (slot_id, rx)
    }

    async fn discard(&self, slot_id: Uuid) {
        self.promises.lock().await.remove(&slot_id);
    }

    async fn attempt(
        &self,
        node_id: &NodeId,
        instance_id: &InstanceId,
        signal: Signal,
        request_id: RequestId,
    ) -> Attempt {
        let req = ForwardCustomSignalRequest {
            request_id: request_id.clone(),
            src_instance_id: instance_id.clone(),
            instance_request_id: request_id,
            req: SignalRequest { signal, instance_id: instance_id.clone(), payload: None },
        };

        match self.sender.forward_custom_signal(node_id, req).await {
            Ok(resp) => match resp.code {
                ErrorCode::ErrNone => Attempt::Success,
                ErrorCode::ErrInstanceNotFound => Attempt::NotFound,
                other => {
                    debug!(instance_id = %instance_id, code = ?other, "kill attempt will be retried");
                    Attempt::Retry
                }
            },
            Err(err) => {
                warn!(instance_id = %instance_id, error = %err, "kill attempt transport error, retrying");
                Attempt::Retry
            }
        }
    }

    /// Implements `KillInstanceWithRetry` (§4.C). Resolves once the target
    /// acknowledges, reports the instance already gone, or the caller
    /// observes the instance's deletion via [`Self::on_instance_delete`].
    pub async fn kill_instance_with_retry(
        &self,
        node_id: NodeId,
        instance_id: InstanceId,
        signal: Signal,
    ) -> KillOutcome {
        let is_sync = matches!(signal, Signal::KillInstanceSync);
        let (slot_id, mut rx) = self.register(instance_id.clone()).await;

        loop {
            if self.registry.resolve(&node_id).is_err() {
                warn!(node_id = %node_id, instance_id = %instance_id, "local scheduler address unresolved, retrying");
                tokio::select! {
                    biased;
                    resolved = &mut rx => {
                        return resolved.map(outcome_from_code).unwrap_or(KillOutcome::Success);
                    }
                    _ = tokio::time::sleep(self.retry_interval) => continue,
                }
            }

            let request_id = RequestId::new(Uuid::new_v4().to_string());
            let attempt_fut = self.attempt(&node_id, &instance_id, signal, request_id);

            let attempt = if is_sync {
                tokio::select! {
                    biased;
                    resolved = &mut rx => {
                        return resolved.map(outcome_from_code).unwrap_or(KillOutcome::Success);
                    }
                    a = attempt_fut => a,
                }
            } else {
                tokio::select! {
                    biased;
                    resolved = &mut rx => {
                        return resolved.map(outcome_from_code).unwrap_or(KillOutcome::Success);
                    }
                    timed = tokio::time::timeout(self.kill_timeout, attempt_fut) => match timed {
                        Ok(a) => a,
                        Err(_) => Attempt::Retry,
                    },
                }
            };

            match attempt {
                Attempt::Success => {
                    self.discard(slot_id).await;
                    return KillOutcome::Success;
                }
                Attempt::NotFound => {
                    self.discard(slot_id).await;
                    return KillOutcome::InstanceNotFound;
                }
                Attempt::Retry => {
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }
}

fn outcome_from_code(code: ErrorCode) -> KillOutcome {
    match code {
        ErrorCode::ErrInstanceNotFound => KillOutcome::InstanceNotFound,
        _ => KillOutcome::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackSignalSender;

    fn engine(answer: ErrorCode) -> KillRetryEngine {
        let sender = Arc::new(LoopbackSignalSender::with_answer(answer));
        let registry = Arc::new(LocalSchedulerRegistry::new());
        registry.register(NodeId::new("n1"), "10.0.0.1:9000");
        KillRetryEngine::with_timing(sender, registry, Duration::from_millis(5), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn resolves_ok_on_err_none() {
        let engine = engine(ErrorCode::ErrNone);
        let outcome = engine
            .kill_instance_with_retry(NodeId::new("n1"), InstanceId::new("i1"), Signal::ShutDownSignal)
            .await;
        assert_eq!(outcome, KillOutcome::Success);
    }

    #[tokio::test]
    async fn resolves_not_found_as_terminal() {
        let engine = engine(ErrorCode::ErrInstanceNotFound);
        let outcome = engine
            .kill_instance_with_retry(NodeId::new("n1"), InstanceId::new("i1"), Signal::ShutDownSignal)
            .await;
        assert_eq!(outcome, KillOutcome::InstanceNotFound);
    }

    #[tokio::test]
    async fn instance_delete_resolves_pending_kill() {
        let engine = Arc::new(engine(ErrorCode::InnerSystemError));
        let instance_id = InstanceId::new("i1");
        let engine2 = engine.clone();
        let id2 = instance_id.clone();
        let handle = tokio::spawn(async move {
            engine2.kill_instance_with_retry(NodeId::new("n1"), id2, Signal::ShutDownSignal).await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.on_instance_delete(&instance_id).await;

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, KillOutcome::Success);
    }
}
