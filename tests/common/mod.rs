//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use k8s_heartbeat::config::HeartbeatConfig;
use k8s_heartbeat::error::ControlPlaneError;
use k8s_heartbeat::health::types::{
    Condition, ConditionStatus, Instance, InstanceEvent, InstanceSelector, WorkloadSnapshot,
    INSTANCE_READY, WORKLOAD_AVAILABLE,
};
use k8s_heartbeat::health::{
    ControlPlane, EvaluationPolicy, FixedSampler, HealthChecker, WorkloadEvaluator,
};
use k8s_heartbeat::http::HttpServer;
use k8s_heartbeat::lifecycle::Shutdown;

pub const TOKEN: &str = "test";
/// `base64("test")`
pub const TOKEN_B64: &str = "dGVzdA==";

/// In-memory control plane with call counters.
#[derive(Default)]
pub struct StubControlPlane {
    pub workload: Option<WorkloadSnapshot>,
    pub instances: Vec<Instance>,
    pub instances_error: Option<ControlPlaneError>,
    pub events: Vec<InstanceEvent>,
    pub ping_error: Option<ControlPlaneError>,
    /// Delay before `get_workload` answers.
    pub workload_delay: Option<Duration>,
    pub calls: Arc<CallCounts>,
    pub last_selector: Mutex<Option<InstanceSelector>>,
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub workloads: AtomicUsize,
    pub workloads_completed: AtomicUsize,
    pub instances: AtomicUsize,
    pub events: AtomicUsize,
    pub pings: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.workloads.load(Ordering::SeqCst)
            + self.instances.load(Ordering::SeqCst)
            + self.events.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

impl StubControlPlane {
    /// An available deployment `name` selecting `app=<name>`.
    pub fn with_workload(name: &str) -> Self {
        Self {
            workload: Some(WorkloadSnapshot {
                name: name.to_string(),
                conditions: vec![Condition::new(WORKLOAD_AVAILABLE, ConditionStatus::True)],
                selector: InstanceSelector::from_labels([("app", name)]),
            }),
            ..Default::default()
        }
    }

    pub fn instance(mut self, name: &str, ready: bool) -> Self {
        let status = if ready {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        };
        self.instances.push(Instance {
            name: name.to_string(),
            conditions: vec![Condition::new(INSTANCE_READY, status)],
        });
        self
    }

    /// Append an event `minute` minutes past a fixed base time.
    pub fn event(mut self, type_: &str, reason: &str, minute: u32) -> Self {
        self.events.push(InstanceEvent {
            type_: type_.to_string(),
            reason: reason.to_string(),
            message: format!("{reason} happened"),
            occurred_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).single(),
        });
        self
    }
}

#[async_trait]
impl ControlPlane for StubControlPlane {
    async fn get_workload(
        &self,
        _namespace: &str,
        name: &str,
    ) -> Result<WorkloadSnapshot, ControlPlaneError> {
        self.calls.workloads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.workload_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.workloads_completed.fetch_add(1, Ordering::SeqCst);
        match &self.workload {
            Some(w) if w.name == name => Ok(w.clone()),
            _ => Err(ControlPlaneError::NotFound {
                resource: "deployment",
                name: name.to_string(),
            }),
        }
    }

    async fn list_instances(
        &self,
        _namespace: &str,
        selector: &InstanceSelector,
    ) -> Result<Vec<Instance>, ControlPlaneError> {
        self.calls.instances.fetch_add(1, Ordering::SeqCst);
        *self.last_selector.lock().unwrap() = Some(selector.clone());
        match &self.instances_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.instances.clone()),
        }
    }

    async fn list_events(
        &self,
        _namespace: &str,
        _involved_object: &str,
    ) -> Result<Vec<InstanceEvent>, ControlPlaneError> {
        self.calls.events.fetch_add(1, Ordering::SeqCst);
        Ok(self.events.clone())
    }

    async fn ping(&self) -> Result<(), ControlPlaneError> {
        self.calls.pings.fetch_add(1, Ordering::SeqCst);
        match &self.ping_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Evaluator over `stub` that always samples the first instance.
pub fn evaluator(stub: StubControlPlane) -> (Arc<dyn HealthChecker>, Arc<CallCounts>) {
    let calls = stub.calls.clone();
    let checker = WorkloadEvaluator::with_sampler(
        stub,
        EvaluationPolicy::from(&HeartbeatConfig::default().health),
        Arc::new(FixedSampler(0)),
    );
    (Arc::new(checker), calls)
}

/// Config with the test token and a generous quota.
pub fn test_config() -> HeartbeatConfig {
    let mut config = HeartbeatConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.auth.token = TOKEN.to_string();
    config
}

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub config_tx: mpsc::UnboundedSender<HeartbeatConfig>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn component_url(&self, namespace: &str, component: &str) -> String {
        self.url(&format!("/api/healthz/{namespace}/component/{component}"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_server(config: HeartbeatConfig, checker: Arc<dyn HealthChecker>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config, checker);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestServer {
        addr,
        config_tx,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
