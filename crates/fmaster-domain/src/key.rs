//! Metadata-store key layout helpers (§6). Prefixes are fixed; the trailing
//! segment is always the id.

use crate::ids::{BundleId, GroupId, InstanceId, NodeId, TenantId};

pub const INSTANCE_PREFIX: &str = "/instance/business";
pub const GROUP_PREFIX: &str = "/group";
pub const RESOURCE_GROUP_PREFIX: &str = "/resource-group";
pub const ABNORMAL_SCHEDULER_PREFIX: &str = "/abnormal/localscheduler";
pub const DEBUG_PREFIX: &str = "/debug";
pub const FUNCTION_META_PREFIX: &str = "/functions";

/// `/instance/business/<tenant>/tenant/<tenantId>/function/<functionId>/version/<ver>/<az>/<requestId>/<instanceId>`
pub fn instance_key(
    tenant: &str,
    tenant_id: &TenantId,
    function_id: &str,
    version: &str,
    az: &str,
    request_id: &str,
    instance_id: &InstanceId,
) -> String {
    format!(
        "{INSTANCE_PREFIX}/{tenant}/tenant/{tenant_id}/function/{function_id}/version/{version}/{az}/{request_id}/{instance_id}"
    )
}

pub fn group_key(sub_ns: &str, group_id: &GroupId) -> String {
    format!("{GROUP_PREFIX}/{sub_ns}/{group_id}")
}

pub fn resource_group_key(tenant_id: &TenantId, name: &str) -> String {
    format!("{RESOURCE_GROUP_PREFIX}/{tenant_id}/{name}")
}

pub fn abnormal_scheduler_key(node_id: &NodeId) -> String {
    format!("{ABNORMAL_SCHEDULER_PREFIX}/{node_id}")
}

pub fn debug_key(instance_id: &InstanceId) -> String {
    format!("{DEBUG_PREFIX}/{instance_id}")
}

/// Extract the trailing id segment (the last `/`-delimited component) of a
/// metadata-store key.
pub fn trailing_id(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleKeyRef<'a>(pub &'a BundleId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_id_is_last_segment() {
        assert_eq!(trailing_id("/group/sub/g1"), "g1");
        assert_eq!(trailing_id("no-slash"), "no-slash");
    }

    #[test]
    fn instance_key_matches_layout() {
        let k = instance_key("biz", &TenantId::new("t1"), "f1", "v1", "az1", "r1", &InstanceId::new("i1"));
        assert_eq!(
            k,
            "/instance/business/biz/tenant/t1/function/f1/version/v1/az1/r1/i1"
        );
    }
}
