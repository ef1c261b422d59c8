//! Metrics collection and exposition.
//!
//! # Metrics
//! - `heartbeat_checks_total` (counter): component checks by outcome
//! - `heartbeat_check_duration_seconds` (histogram): evaluator latency
//! - `heartbeat_rejections_total` (counter): gate rejections by kind
//! - `heartbeat_ping_total` (counter): liveness probes by outcome
//!
//! Recording goes through the `metrics` facade and is a no-op until an
//! exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{ErrorKind, HealthVerdict};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn outcome(verdict: &HealthVerdict) -> &'static str {
    match verdict.reason {
        None => "healthy",
        Some(kind) => kind.as_str(),
    }
}

pub fn record_check(verdict: &HealthVerdict, start: Instant) {
    metrics::counter!("heartbeat_checks_total", "outcome" => outcome(verdict)).increment(1);
    metrics::histogram!("heartbeat_check_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(kind: ErrorKind) {
    metrics::counter!("heartbeat_rejections_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_ping(verdict: &HealthVerdict) {
    metrics::counter!("heartbeat_ping_total", "outcome" => outcome(verdict)).increment(1);
}
