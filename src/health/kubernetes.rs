//! Control plane backed by the Kubernetes API.
//!
//! Workloads are `apps/v1` Deployments, instances are Pods, and instance
//! history comes from core `v1` Events.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::Request;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::config::ControlPlaneConfig;
use crate::error::ControlPlaneError;
use crate::health::control_plane::ControlPlane;
use crate::health::types::{
    Condition, ConditionStatus, Instance, InstanceEvent, InstanceSelector, SelectorOperator,
    SelectorRequirement, WorkloadSnapshot,
};

/// [`ControlPlane`] over a kube [`Client`].
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
}

impl KubeControlPlane {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from an explicit kubeconfig, or infer one (in-cluster
    /// service account, then `~/.kube/config`).
    pub async fn connect(config: &ControlPlaneConfig) -> Result<Self> {
        let mut kube_config = match &config.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("Failed to read kubeconfig from {}", path.display()))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .context("Failed to create Kubernetes config from kubeconfig")?
            }
            None => Config::infer()
                .await
                .context("Failed to infer Kubernetes config")?,
        };

        kube_config.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
        kube_config.read_timeout = Some(Duration::from_secs(config.read_timeout_secs));

        tracing::info!(cluster_url = %kube_config.cluster_url, "Control plane client configured");

        let client = Client::try_from(kube_config).context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }
}

fn map_error(err: kube::Error, resource: &'static str, name: &str) -> ControlPlaneError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => ControlPlaneError::NotFound {
            resource,
            name: name.to_string(),
        },
        kube::Error::Api(resp) => ControlPlaneError::Status {
            code: resp.code,
            message: resp.message,
        },
        other => ControlPlaneError::Transport(other.to_string()),
    }
}

fn to_selector(selector: LabelSelector) -> Result<InstanceSelector, ControlPlaneError> {
    let match_expressions = selector
        .match_expressions
        .unwrap_or_default()
        .into_iter()
        .map(|req| -> Result<SelectorRequirement, ControlPlaneError> {
            Ok(SelectorRequirement {
                operator: SelectorOperator::parse(&req.operator)?,
                key: req.key,
                values: req.values.unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, ControlPlaneError>>()?;

    Ok(InstanceSelector {
        match_labels: selector.match_labels.unwrap_or_default(),
        match_expressions,
    })
}

fn to_workload(name: &str, deployment: Deployment) -> Result<WorkloadSnapshot, ControlPlaneError> {
    let conditions = deployment
        .status
        .and_then(|s| s.conditions)
        .unwrap_or_default()
        .into_iter()
        .map(|c| Condition::new(c.type_, ConditionStatus::parse(&c.status)))
        .collect();

    let selector = match deployment.spec {
        Some(spec) => to_selector(spec.selector)?,
        None => InstanceSelector::default(),
    };

    Ok(WorkloadSnapshot {
        name: deployment.metadata.name.unwrap_or_else(|| name.to_string()),
        conditions,
        selector,
    })
}

fn to_instance(pod: Pod) -> Instance {
    let conditions = pod
        .status
        .and_then(|s| s.conditions)
        .unwrap_or_default()
        .into_iter()
        .map(|c| Condition::new(c.type_, ConditionStatus::parse(&c.status)))
        .collect();

    Instance {
        name: pod.metadata.name.unwrap_or_default(),
        conditions,
    }
}

fn to_event(event: Event) -> InstanceEvent {
    let occurred_at = event
        .last_timestamp
        .map(|t| t.0)
        .or_else(|| event.event_time.map(|t| t.0))
        .or_else(|| event.first_timestamp.map(|t| t.0))
        .or_else(|| event.metadata.creation_timestamp.map(|t| t.0));

    InstanceEvent {
        type_: event.type_.unwrap_or_default(),
        reason: event.reason.unwrap_or_default(),
        message: event.message.unwrap_or_default(),
        occurred_at,
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn get_workload(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<WorkloadSnapshot, ControlPlaneError> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let deployment = deployments
            .get(name)
            .await
            .map_err(|e| map_error(e, "deployment", name))?;
        to_workload(name, deployment)
    }

    async fn list_instances(
        &self,
        namespace: &str,
        selector: &InstanceSelector,
    ) -> Result<Vec<Instance>, ControlPlaneError> {
        let label_selector = selector.to_query()?;
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(&label_selector);

        let pod_list = pods
            .list(&lp)
            .await
            .map_err(|e| map_error(e, "pods", &label_selector))?;

        Ok(pod_list.items.into_iter().map(to_instance).collect())
    }

    async fn list_events(
        &self,
        namespace: &str,
        involved_object: &str,
    ) -> Result<Vec<InstanceEvent>, ControlPlaneError> {
        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().fields(&format!("involvedObject.name={involved_object}"));

        let event_list = events
            .list(&lp)
            .await
            .map_err(|e| map_error(e, "events", involved_object))?;

        Ok(event_list.items.into_iter().map(to_event).collect())
    }

    async fn ping(&self) -> Result<(), ControlPlaneError> {
        let request = Request::get("/healthz")
            .body(Vec::new())
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;

        let body = self
            .client
            .request_text(request)
            .await
            .map_err(|e| map_error(e, "healthz", "/healthz"))?;

        if body.trim() == "ok" {
            Ok(())
        } else {
            Err(ControlPlaneError::Status {
                code: 200,
                message: format!("unexpected healthz body {body:?}"),
            })
        }
    }
}
