use std::collections::HashMap;

use async_trait::async_trait;
use fmaster_domain::{BundleId, ErrorCode, NodeId, TenantId};

use crate::error::RgroupError;

/// Desired shape of one bundle, as passed to the scheduler's placement RPC.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub bundle_id: BundleId,
    pub labels: HashMap<String, String>,
    pub resources: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct PlaceBundlesRequest {
    pub tenant_id: TenantId,
    pub r_group_name: String,
    pub bundles: Vec<BundleRequest>,
}

#[derive(Debug, Clone)]
pub struct PlaceBundlesResponse {
    pub code: ErrorCode,
    pub placements: Vec<(BundleId, NodeId)>,
}

/// Stand-in for the global scheduler's bundle-placement RPC (§4.F). The
/// scheduler itself — placement policy, capacity accounting — is an
/// external collaborator; this trait is the seam the controller calls
/// through.
#[async_trait]
pub trait BundlePlacer: Send + Sync + 'static {
    async fn place_bundles(
        &self,
        req: PlaceBundlesRequest,
    ) -> Result<PlaceBundlesResponse, RgroupError>;

    /// Reschedule a single bundle off its failed node, returning the new
    /// node it was placed on.
    async fn reschedule_bundle(
        &self,
        tenant_id: &TenantId,
        bundle_id: &BundleId,
    ) -> Result<NodeId, RgroupError>;
}

/// Local, no-I/O placer used by tests and the `fmaster-cli serve` default
/// backend: round-robins bundles across a fixed node pool.
#[derive(Debug)]
pub struct LocalBundlePlacer {
    nodes: Vec<NodeId>,
}

impl LocalBundlePlacer {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }

    fn pick(&self, seed: usize) -> Option<NodeId> {
        if self.nodes.is_empty() {
            return None;
        }
        Some(self.nodes[seed % self.nodes.len()].clone())
    }
}

#[async_trait]
impl BundlePlacer for LocalBundlePlacer {
    async fn place_bundles(
        &self,
        req: PlaceBundlesRequest,
    ) -> Result<PlaceBundlesResponse, RgroupError> {
        if self.nodes.is_empty() {
            return Ok(PlaceBundlesResponse { code: ErrorCode::ResourceNotEnough, placements: vec![] });
        }
        let placements = req
            .bundles
            .iter()
            .enumerate()
            .map(|(i, b)| (b.bundle_id.clone(), self.pick(i).expect("checked non-empty")))
            .collect();
        Ok(PlaceBundlesResponse { code: ErrorCode::ErrNone, placements })
    }

    async fn reschedule_bundle(
        &self,
        _tenant_id: &TenantId,
        bundle_id: &BundleId,
    ) -> Result<NodeId, RgroupError> {
        self.pick(bundle_id.as_str().len())
            .ok_or_else(|| RgroupError::PlacementFailed(bundle_id.to_string()))
    }
}
