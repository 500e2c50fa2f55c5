pub mod caches;
pub mod error;
pub mod manager;
pub mod placer;

pub use caches::ResourceGroupCaches;
pub use error::RgroupError;
pub use manager::{CreateOutcome, CreateResourceGroupRequest, ResourceGroupManager};
pub use placer::{BundlePlacer, BundleRequest, LocalBundlePlacer, PlaceBundlesRequest, PlaceBundlesResponse};
