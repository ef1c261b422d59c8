//! Workload health evaluation.
//!
//! # Pipeline
//! ```text
//! get_workload ──✗──▶ WorkloadUnavailable
//!     │
//! list_instances ──✗──▶ QueryFailed
//!     │ empty ──▶ NoInstancesAvailable
//!     │
//! sample one instance
//!     │ not Ready ──▶ InstanceUnready
//!     │
//! list_events ──✗──▶ QueryFailed
//!     │ none ──▶ healthy
//!     │ latest is Error / escalated Warning ──▶ InstanceUnhealthyEvent
//!     ▼
//! healthy
//! ```
//!
//! Each step runs at most once per check; nothing is retried or cached.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::HealthPolicyConfig;
use crate::error::{CheckError, CheckResult};
use crate::health::checker::HealthChecker;
use crate::health::control_plane::ControlPlane;
use crate::health::sampler::{InstanceSampler, RandomSampler};
use crate::health::types::{most_recent_event, InstanceEvent};

const EVENT_ERROR: &str = "Error";
const EVENT_WARNING: &str = "Warning";

/// Which signals fail a check beyond the fixed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationPolicy {
    pub escalated_warning_reasons: Vec<String>,
    pub require_available_condition: bool,
}

impl From<&HealthPolicyConfig> for EvaluationPolicy {
    fn from(config: &HealthPolicyConfig) -> Self {
        Self {
            escalated_warning_reasons: config.escalated_warning_reasons.clone(),
            require_available_condition: config.require_available_condition,
        }
    }
}

impl EvaluationPolicy {
    /// `Error` events always fail; `Warning` events fail only for escalated
    /// reasons.
    pub fn is_unhealthy_event(&self, event: &InstanceEvent) -> bool {
        if event.type_.eq_ignore_ascii_case(EVENT_ERROR) {
            return true;
        }
        event.type_.eq_ignore_ascii_case(EVENT_WARNING)
            && self
                .escalated_warning_reasons
                .iter()
                .any(|r| r.eq_ignore_ascii_case(&event.reason))
    }
}

/// Decides workload health from control-plane state.
pub struct WorkloadEvaluator<C> {
    control_plane: C,
    sampler: Arc<dyn InstanceSampler>,
    policy: EvaluationPolicy,
}

impl<C: ControlPlane> WorkloadEvaluator<C> {
    pub fn new(control_plane: C, policy: EvaluationPolicy) -> Self {
        Self::with_sampler(control_plane, policy, Arc::new(RandomSampler::from_entropy()))
    }

    pub fn with_sampler(
        control_plane: C,
        policy: EvaluationPolicy,
        sampler: Arc<dyn InstanceSampler>,
    ) -> Self {
        Self {
            control_plane,
            sampler,
            policy,
        }
    }

    pub fn control_plane(&self) -> &C {
        &self.control_plane
    }

    /// Run the full pipeline for one workload.
    #[tracing::instrument(skip(self), fields(instance = tracing::field::Empty))]
    pub async fn evaluate(&self, namespace: &str, workload: &str) -> CheckResult<()> {
        let snapshot = self
            .control_plane
            .get_workload(namespace, workload)
            .await
            .map_err(|source| CheckError::WorkloadUnavailable {
                name: workload.to_string(),
                source,
            })?;

        if !snapshot.is_available() {
            tracing::warn!("Workload does not report Available=True");
            if self.policy.require_available_condition {
                return Err(CheckError::WorkloadNotAvailable {
                    name: workload.to_string(),
                });
            }
        }

        let instances = self
            .control_plane
            .list_instances(namespace, &snapshot.selector)
            .await
            .map_err(|source| CheckError::QueryFailed {
                operation: "list instances",
                source,
            })?;

        tracing::debug!(count = instances.len(), "Listed workload instances");

        if instances.is_empty() {
            return Err(CheckError::NoInstancesAvailable {
                workload: workload.to_string(),
            });
        }

        let instance = &instances[self.sampler.pick(instances.len())];
        tracing::Span::current().record("instance", instance.name.as_str());
        tracing::info!("Sampled instance");

        if !instance.is_ready() {
            return Err(CheckError::InstanceUnready {
                instance: instance.name.clone(),
            });
        }

        let events = self
            .control_plane
            .list_events(namespace, &instance.name)
            .await
            .map_err(|source| CheckError::QueryFailed {
                operation: "list instance events",
                source,
            })?;

        let Some(latest) = most_recent_event(&events) else {
            tracing::info!("Instance has no events");
            return Ok(());
        };

        tracing::debug!(
            event_type = %latest.type_,
            reason = %latest.reason,
            message = %latest.message,
            "Latest instance event"
        );

        if self.policy.is_unhealthy_event(latest) {
            return Err(CheckError::InstanceUnhealthyEvent {
                instance: instance.name.clone(),
                event_type: latest.type_.clone(),
                reason: latest.reason.clone(),
                message: latest.message.clone(),
            });
        }

        Ok(())
    }

    /// Probe the control plane itself.
    pub async fn probe(&self) -> CheckResult<()> {
        self.control_plane
            .ping()
            .await
            .map_err(CheckError::ControlPlaneUnreachable)
    }
}

#[async_trait]
impl<C: ControlPlane> HealthChecker for WorkloadEvaluator<C> {
    async fn check_component(&self, namespace: &str, component: &str) -> CheckResult<()> {
        self.evaluate(namespace, component).await
    }

    async fn ping(&self) -> CheckResult<()> {
        self.probe().await
    }
}
