pub mod controller;
pub mod error;
pub mod reconciler;
pub mod role;

pub use controller::FamilyLifecycleController;
pub use error::ReconcileError;
pub use reconciler::{WatchSyncReconciler, DEFAULT_SWEEP_INTERVAL};
pub use role::{LeaderRoleGate, Role};
