pub mod error;
pub mod ids;
pub mod key;
pub mod request_id;
pub mod signal;
pub mod types;

pub use error::DomainError;
pub use ids::{
    BundleId, FunctionId, GroupId, InstanceId, JobId, NodeId, RequestId, TenantId,
    GROUP_MANAGER_OWNER, INSTANCE_MANAGER_OWNER, PRIMARY_TAG,
};
pub use signal::{ErrorCode, Signal};
pub use types::{
    create_option_keys, extension_keys, BundleInfo, BundleState, DebugInstanceInfo, DebugStatus,
    GroupInfo, GroupOpts, GroupState, InstanceInfo, InstanceState, InstanceType,
    ResourceGroupInfo, ResourceGroupStatus,
};
