use std::sync::Arc;

use fmaster_reconciler::FamilyLifecycleController;
use fmaster_rgroup::ResourceGroupManager;
use fmaster_store::MetaStoreClient;
use tokio::sync::Mutex;

/// Shared handles the reconciler loop and the HTTP layer both hold — the
/// same `Arc<Mutex<_>>` pair [`fmaster_reconciler::WatchSyncReconciler`]
/// sweeps, so a query always sees whatever the last sweep or live watch
/// event left behind.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<FamilyLifecycleController>>,
    pub rgroups: Arc<Mutex<ResourceGroupManager>>,
    pub store: Arc<dyn MetaStoreClient>,
    pub auth_token: Arc<String>,
}
