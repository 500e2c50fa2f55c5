use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{BundleId, FunctionId, GroupId, InstanceId, JobId, NodeId, RequestId, TenantId};

// ── Instances ─────────────────────────────────────────────────────────────────

/// Lifecycle state of a scheduled function instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Scheduling,
    Running,
    Exiting,
    Exited,
    Fatal,
}

impl InstanceState {
    /// Terminal states are never reconsidered for scheduling decisions.
    pub fn is_terminal(self) -> bool {
        matches!(self, InstanceState::Exiting | InstanceState::Exited | InstanceState::Fatal)
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceState::Scheduling => "scheduling",
            InstanceState::Running => "running",
            InstanceState::Exiting => "exiting",
            InstanceState::Exited => "exited",
            InstanceState::Fatal => "fatal",
        };
        write!(f, "{}", s)
    }
}

/// Whether an instance is a regular function instance or the root
/// "app driver" of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceType {
    Regular,
    AppDriver,
}

/// Well-known `createOptions` keys (§3).
pub mod create_option_keys {
    pub const RECOVER_RETRY_TIMES: &str = "RECOVER_RETRY_TIMES";
    pub const APP_ENTRYPOINT: &str = "APP_ENTRYPOINT";
    pub const FUNCTION_GROUP_RUNNING_INFO: &str = "FUNCTION_GROUP_RUNNING_INFO";
}

/// Well-known `extensions` keys (§3).
pub mod extension_keys {
    pub const NAMED: &str = "NAMED";
    pub const SOURCE: &str = "source";
}

/// The unit of scheduling (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub instance_id: InstanceId,
    pub request_id: RequestId,
    /// Empty means this instance is a root (attaches under the family's dummy root).
    pub parent_id: InstanceId,
    pub group_id: Option<GroupId>,
    /// Node the instance lives on, or [`crate::ids::INSTANCE_MANAGER_OWNER`]
    /// when the master holds it during recovery.
    pub function_proxy_id: String,
    pub function: FunctionId,
    pub job_id: JobId,
    pub state: InstanceState,
    #[serde(rename = "type")]
    pub instance_type: InstanceType,
    pub detached: bool,
    /// Monotone version; a stale watch event (lower version than what's
    /// cached) must be ignored.
    pub version: u64,
    pub create_options: HashMap<String, String>,
    pub extensions: HashMap<String, String>,
}

impl InstanceInfo {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }

    /// §4.D: an app-driver instance that finished successfully is the root
    /// of a successfully completed application, not a crash.
    pub fn is_finished_app_driver(&self) -> bool {
        self.instance_type == InstanceType::AppDriver
            && self.create_options.contains_key(create_option_keys::APP_ENTRYPOINT)
    }

    pub fn recover_retry_times(&self) -> u32 {
        self.create_options
            .get(create_option_keys::RECOVER_RETRY_TIMES)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_named(&self) -> bool {
        self.extensions
            .get(extension_keys::NAMED)
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

// ── Groups ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupState {
    Scheduling,
    Running,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupOpts {
    /// When true, any member becoming FATAL fails the whole group (§3).
    pub same_running_lifecycle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group_id: GroupId,
    /// A node id, or [`crate::ids::GROUP_MANAGER_OWNER`] when no node is
    /// currently authoritative.
    pub owner_proxy: String,
    /// The instance that owns this group's lifecycle, empty if master-owned.
    pub parent_id: InstanceId,
    pub state: GroupState,
    pub group_opts: GroupOpts,
    pub request_id: RequestId,
}

// ── Resource groups / bundles ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleState {
    Pending,
    Created,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleInfo {
    pub bundle_id: BundleId,
    pub r_group_name: String,
    pub tenant_id: TenantId,
    /// Set only when `state == Created` (§3 invariant).
    pub function_proxy_id: Option<NodeId>,
    pub labels: HashMap<String, String>,
    pub resources: HashMap<String, f64>,
    pub state: BundleState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceGroupStatus {
    Pending,
    Created,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroupInfo {
    pub name: String,
    pub tenant_id: TenantId,
    /// [`crate::ids::PRIMARY_TAG`] or a node id.
    pub owner: String,
    pub request_id: RequestId,
    pub status: ResourceGroupStatus,
    pub bundles: Vec<BundleId>,
    pub group_opts: GroupOpts,
}

// ── Debug sidecar ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugStatus {
    Attached,
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInstanceInfo {
    pub instance_id: InstanceId,
    pub pid: u32,
    pub debug_server: String,
    pub status: DebugStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_instance() -> InstanceInfo {
        InstanceInfo {
            instance_id: InstanceId::new("i1"),
            request_id: RequestId::new("r1"),
            parent_id: InstanceId::new(""),
            group_id: None,
            function_proxy_id: "n1".to_string(),
            function: FunctionId::new("f1"),
            job_id: JobId::new("j1"),
            state: InstanceState::Running,
            instance_type: InstanceType::Regular,
            detached: false,
            version: 1,
            create_options: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    #[test]
    fn root_instance_has_empty_parent() {
        let inst = sample_instance();
        assert!(inst.is_root());
    }

    #[test]
    fn finished_app_driver_requires_both_fields() {
        let mut inst = sample_instance();
        inst.instance_type = InstanceType::AppDriver;
        assert!(!inst.is_finished_app_driver());
        inst.create_options
            .insert(create_option_keys::APP_ENTRYPOINT.to_string(), "python x.py".to_string());
        assert!(inst.is_finished_app_driver());
    }

    #[test]
    fn recover_retry_times_defaults_to_zero() {
        let inst = sample_instance();
        assert_eq!(inst.recover_retry_times(), 0);
    }

    #[test]
    fn terminal_states() {
        assert!(InstanceState::Fatal.is_terminal());
        assert!(InstanceState::Exited.is_terminal());
        assert!(InstanceState::Exiting.is_terminal());
        assert!(!InstanceState::Running.is_terminal());
        assert!(!InstanceState::Scheduling.is_terminal());
    }
}
