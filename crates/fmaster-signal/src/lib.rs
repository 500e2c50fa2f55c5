pub mod directory;
pub mod error;
pub mod loopback;
pub mod messages;
pub mod registry;
pub mod retry;
pub mod sender;

pub use directory::{NodeDescriptor, SchedulerDirectory, StaticSchedulerDirectory};
pub use error::SignalError;
pub use loopback::LoopbackSignalSender;
pub use messages::{
    ClearGroupRequest, ClearGroupResponse, ForwardCustomSignalRequest,
    ForwardCustomSignalResponse, ForwardKillRequest, ForwardKillResponse, KillGroupRequest,
    KillGroupResponse, RemoveBundleRequest, RemoveBundleResponse, RemoveBundleResponseStatus,
    SignalRequest,
};
pub use registry::LocalSchedulerRegistry;
pub use retry::{KillOutcome, KillRetryEngine, DEFAULT_KILL_TIMEOUT, DEFAULT_RETRY_KILL_INTERVAL};
pub use sender::SignalSender;
