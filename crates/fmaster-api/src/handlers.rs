use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use fmaster_domain::{
    extension_keys, key, BundleId, DebugInstanceInfo, FunctionId, GroupId, GroupOpts, InstanceInfo,
    RequestId, TenantId,
};
use fmaster_rgroup::{BundleRequest, CreateResourceGroupRequest};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// ── Health ───────────────────────────────────────────────────────────────────

/// `GET /global-scheduler/healthy` (§6): 200 as long as this process can
/// answer at all — no dependency check, matching the contract's "200 on
/// success" with no documented failure body.
pub async fn healthy() -> StatusCode {
    StatusCode::OK
}

// ── Named instances ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct QueryNamedInsResponse {
    pub names: Vec<String>,
}

/// `GET /instance-manager/named-ins` (§6): every instance whose
/// `extensions[NAMED] == "true"`.
pub async fn named_ins(State(state): State<AppState>) -> Json<QueryNamedInsResponse> {
    let controller = state.controller.lock().await;
    let names = controller
        .family()
        .all()
        .into_iter()
        .filter(|info| {
            info.extensions.get(extension_keys::NAMED).map(String::as_str) == Some("true")
        })
        .map(|info| info.instance_id.to_string())
        .collect();
    Json(QueryNamedInsResponse { names })
}

// ── Global scheduler resources ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ResourceGroupSummary {
    pub name: String,
    pub tenant_id: String,
    pub status: String,
    pub bundle_count: usize,
}

#[derive(Debug, Serialize)]
pub struct QueryResourcesInfoResponse {
    pub nodes: Vec<String>,
    pub resource_groups: Vec<ResourceGroupSummary>,
}

/// `GET /global-scheduler/resources` (§6): current node roster plus a
/// summary of every resource group this master knows about.
pub async fn resources_info(State(state): State<AppState>) -> Json<QueryResourcesInfoResponse> {
    let nodes = {
        let controller = state.controller.lock().await;
        controller.roster().snapshot().into_iter().map(|n| n.to_string()).collect()
    };

    let rgroups = state.rgroups.lock().await;
    let resource_groups = rgroups
        .caches()
        .all_rgroup_names()
        .into_iter()
        .filter_map(|name| {
            rgroups.caches().get_rgroup(&name).map(|info| ResourceGroupSummary {
                name: info.name.clone(),
                tenant_id: info.tenant_id.to_string(),
                status: format!("{:?}", info.status),
                bundle_count: info.bundles.len(),
            })
        })
        .collect();

    Json(QueryResourcesInfoResponse { nodes, resource_groups })
}

// ── Bulk instance queries (supplemented, §4.J) ───────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueryInstancesInfoParams {
    pub function_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryInstancesInfoResponse {
    pub instances: Vec<InstanceInfo>,
}

/// `QueryInstancesInfo`, supplemented from `original_source/`'s
/// `InstanceManagerActor::QueryInstancesInfo`: every instance, optionally
/// narrowed to one function, reported through
/// [`fmaster_reconciler::FamilyLifecycleController::effective_view`] so a
/// node that dropped out of the roster is never reported as still running.
pub async fn query_instances_info(
    State(state): State<AppState>,
    Query(params): Query<QueryInstancesInfoParams>,
) -> Json<QueryInstancesInfoResponse> {
    let controller = state.controller.lock().await;
    let function_id = params.function_id.map(FunctionId::new);
    let instances = controller
        .family()
        .all()
        .into_iter()
        .filter(|info| function_id.as_ref().map(|f| &info.function == f).unwrap_or(true))
        .map(|info| controller.effective_view(&info))
        .collect();
    Json(QueryInstancesInfoResponse { instances })
}

#[derive(Debug, Deserialize)]
pub struct QueryDebugInstancesInfoParams {
    pub instance_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryDebugInstanceInfosResponse {
    pub instances: Vec<DebugInstanceInfo>,
}

/// `QueryDebugInstancesInfo`, supplemented from `original_source/`: reads
/// the `/debug/<instanceId>` entries directly from the metadata store,
/// since debug-attach records are not part of the family cache (§6 key
/// layout).
pub async fn query_debug_instances_info(
    State(state): State<AppState>,
    Query(params): Query<QueryDebugInstancesInfoParams>,
) -> Result<Json<QueryDebugInstanceInfosResponse>, ApiError> {
    let entries = state.store.list(key::DEBUG_PREFIX).await?;
    let mut instances = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(id) = &params.instance_id {
            if key::trailing_id(&entry.key) != id {
                continue;
            }
        }
        instances.push(serde_json::from_str::<DebugInstanceInfo>(&entry.value)?);
    }
    Ok(Json(QueryDebugInstanceInfosResponse { instances }))
}

// ── Write operations (§4.E, §4.F, §4.J) ──────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct KillGroupBody {
    pub group_id: String,
}

#[derive(Debug, Serialize)]
pub struct KillGroupResponse {
    pub outcome: String,
}

/// `KillGroup(req)` (§4.E): externally-triggered group teardown.
pub async fn kill_group(
    State(state): State<AppState>,
    Json(body): Json<KillGroupBody>,
) -> Result<Json<KillGroupResponse>, ApiError> {
    let mut controller = state.controller.lock().await;
    let outcome = controller.kill_group(&GroupId::new(body.group_id)).await?;
    Ok(Json(KillGroupResponse { outcome: format!("{:?}", outcome) }))
}

#[derive(Debug, Deserialize)]
pub struct BundleRequestBody {
    pub bundle_id: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub resources: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateResourceGroupBody {
    pub name: String,
    pub tenant_id: String,
    pub owner: String,
    pub request_id: String,
    #[serde(default)]
    pub same_running_lifecycle: bool,
    #[serde(default)]
    pub bundles: Vec<BundleRequestBody>,
}

#[derive(Debug, Serialize)]
pub struct CreateResourceGroupResponse {
    pub outcome: String,
}

/// `CreateResourceGroup(req)` (§4.F): places every requested bundle and
/// persists the group as CREATED or FAILED depending on the outcome.
pub async fn create_resource_group(
    State(state): State<AppState>,
    Json(body): Json<CreateResourceGroupBody>,
) -> Result<Json<CreateResourceGroupResponse>, ApiError> {
    let req = CreateResourceGroupRequest {
        name: body.name,
        tenant_id: TenantId::new(body.tenant_id),
        owner: body.owner,
        request_id: RequestId::new(body.request_id),
        group_opts: GroupOpts { same_running_lifecycle: body.same_running_lifecycle },
        bundles: body
            .bundles
            .into_iter()
            .map(|b| BundleRequest {
                bundle_id: BundleId::new(b.bundle_id),
                labels: b.labels,
                resources: b.resources,
            })
            .collect(),
    };
    let mut rgroups = state.rgroups.lock().await;
    let outcome = rgroups.create_resource_group(req).await?;
    Ok(Json(CreateResourceGroupResponse { outcome: format!("{:?}", outcome) }))
}

/// `DeleteResourceGroup(req)` (§4.F).
pub async fn delete_resource_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut rgroups = state.rgroups.lock().await;
    rgroups.delete_resource_group(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReportUnitAbnormalBody {
    pub bundle_ids: Vec<String>,
}

/// `ForwardReportUnitAbnormal(bundleIds)` (§4.F): reschedules every named
/// bundle off its current node.
pub async fn report_unit_abnormal(
    State(state): State<AppState>,
    Json(body): Json<ReportUnitAbnormalBody>,
) -> Result<StatusCode, ApiError> {
    let bundle_ids = body.bundle_ids.into_iter().map(BundleId::new).collect();
    let mut rgroups = state.rgroups.lock().await;
    rgroups.forward_report_unit_abnormal(bundle_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}
