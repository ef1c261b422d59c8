use async_trait::async_trait;

use crate::error::CheckResult;

/// Health-checking capability exposed to the HTTP layer.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Check whether `component` in `namespace` is healthy.
    async fn check_component(&self, namespace: &str, component: &str) -> CheckResult<()>;

    /// Check whether the checker can reach its own dependency.
    async fn ping(&self) -> CheckResult<()>;
}
