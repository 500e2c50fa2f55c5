use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(InstanceId, "Unique identifier of a function instance.");
string_id!(RequestId, "De-duplication key for a scheduling/kill request.");
string_id!(GroupId, "Identifier of a gang-scheduled instance group.");
string_id!(NodeId, "Identifier of a node running a local scheduler.");
string_id!(BundleId, "Identifier of a resource-group bundle.");
string_id!(JobId, "Identifier grouping all instances of one job.");
string_id!(FunctionId, "Identifier of a function definition.");
string_id!(TenantId, "Identifier of a tenant.");

/// Sentinel `functionProxyId`/`ownerProxy` value meaning "the master itself
/// is authoritative", used when no node currently owns the instance/group.
pub const INSTANCE_MANAGER_OWNER: &str = "InstanceManagerOwner";

/// Sentinel `ownerProxy` value meaning "the master itself is authoritative
/// for this group's lifecycle".
pub const GROUP_MANAGER_OWNER: &str = "GroupManagerOwner";

/// Sentinel `owner` value for a resource group with no node-scoped owner.
pub const PRIMARY_TAG: &str = "PrimaryTag";
