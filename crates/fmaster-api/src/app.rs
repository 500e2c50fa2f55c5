use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use fmaster_reconciler::FamilyLifecycleController;
use fmaster_rgroup::ResourceGroupManager;
use fmaster_store::MetaStoreClient;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::AppState;

/// Builds the instance-manager's HTTP surface (§4.J, §6). One route per
/// handler; bearer-auth middleware covers every route.
pub fn build_app(
    controller: Arc<Mutex<FamilyLifecycleController>>,
    rgroups: Arc<Mutex<ResourceGroupManager>>,
    store: Arc<dyn MetaStoreClient>,
    auth_token: Arc<String>,
) -> Router {
    let state = AppState { controller, rgroups, store, auth_token };

    Router::new()
        .route("/instance-manager/named-ins", get(handlers::named_ins))
        .route("/instance-manager/query-instances-info", get(handlers::query_instances_info))
        .route(
            "/instance-manager/query-debug-instances-info",
            get(handlers::query_debug_instances_info),
        )
        .route("/global-scheduler/resources", get(handlers::resources_info))
        .route("/global-scheduler/healthy", get(handlers::healthy))
        .route("/instance-manager/kill-group", post(handlers::kill_group))
        .route("/global-scheduler/resource-groups", post(handlers::create_resource_group))
        .route("/global-scheduler/resource-groups/:name", delete(handlers::delete_resource_group))
        .route("/global-scheduler/report-unit-abnormal", post(handlers::report_unit_abnormal))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
