use serde::{Deserialize, Serialize};

/// Wire signal constants (§6). These numeric values are part of the
/// cross-process contract with local scheduler controllers and must not be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum Signal {
    ShutDownSignal = 0,
    ShutDownSignalAll = 1,
    GroupExitSignal = 2,
    FamilyExitSignal = 3,
    KillInstanceSync = 4,
    ErasePendingThread = 5,
    Update = 6,
    UpdateManager = 7,
    Subscribe = 8,
    GetInstance = 9,
    QueryDsAddress = 10,
    Accelerate = 11,
}

impl Signal {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Signal::ShutDownSignal => "SHUT_DOWN_SIGNAL",
            Signal::ShutDownSignalAll => "SHUT_DOWN_SIGNAL_ALL",
            Signal::GroupExitSignal => "GROUP_EXIT_SIGNAL",
            Signal::FamilyExitSignal => "FAMILY_EXIT_SIGNAL",
            Signal::KillInstanceSync => "killInstanceSync",
            Signal::ErasePendingThread => "ErasePendingThread",
            Signal::Update => "Update",
            Signal::UpdateManager => "UpdateManager",
            Signal::Subscribe => "Subscribe",
            Signal::GetInstance => "GetInstance",
            Signal::QueryDsAddress => "QueryDsAddress",
            Signal::Accelerate => "Accelerate",
        };
        write!(f, "{}", s)
    }
}

/// Error codes local controllers reply with (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ErrorCode {
    #[default]
    ErrNone,
    ErrInstanceNotFound,
    ResourceNotEnough,
    InnerCommunication,
    InnerSystemError,
    EtcdOperationError,
    ParamInvalid,
    FunctionMasterTimeout,
}

impl ErrorCode {
    pub fn is_success(self) -> bool {
        matches!(self, ErrorCode::ErrNone)
    }
}
