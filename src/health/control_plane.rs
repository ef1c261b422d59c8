//! Query capability the evaluator needs from the cluster API.

use async_trait::async_trait;

use crate::error::ControlPlaneError;
use crate::health::types::{Instance, InstanceEvent, InstanceSelector, WorkloadSnapshot};

/// Read-only access to the orchestration control plane.
///
/// Implementations must not cache: every call reflects the API server's
/// current view.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetch a workload by name.
    async fn get_workload(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadSnapshot, ControlPlaneError>;

    /// List instances matching `selector`, in API order.
    async fn list_instances(
        &self,
        namespace: &str,
        selector: &InstanceSelector,
    ) -> Result<Vec<Instance>, ControlPlaneError>;

    /// List events whose involved object is `involved_object`.
    async fn list_events(
        &self,
        namespace: &str,
        involved_object: &str,
    ) -> Result<Vec<InstanceEvent>, ControlPlaneError>;

    /// Probe the API server's own health endpoint.
    async fn ping(&self) -> Result<(), ControlPlaneError>;
}
