//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a bare environment is a valid deployment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the heartbeat service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Control-plane connection settings.
    pub control_plane: ControlPlaneConfig,

    /// Shared-secret credential.
    pub auth: AuthConfig,

    /// Admission limiter settings.
    pub rate_limit: RateLimitConfig,

    /// Health decision policy.
    pub health: HealthPolicyConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Control-plane connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Path to a kubeconfig file. In-cluster or default discovery when unset.
    pub kubeconfig: Option<PathBuf>,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Read timeout for a single API call in seconds.
    pub read_timeout_secs: u64,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            connect_timeout_secs: 5,
            read_timeout_secs: 15,
        }
    }
}

/// Shared-secret configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Token callers must present.
    pub token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: placeholder. Set AUTH_TOKEN_BASIC in production.
            token: "xxx".to_string(),
        }
    }
}

/// What a limiter bucket is keyed on.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitKey {
    /// One bucket shared by every caller.
    #[default]
    Global,
    /// One bucket per peer IP address.
    Client,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum admitted requests per period.
    pub limit: u64,

    /// Window length in seconds.
    pub period_secs: u64,

    /// Bucket key.
    pub key: RateLimitKey,
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 3600,
            period_secs: 3600,
            key: RateLimitKey::Global,
        }
    }
}

/// Decision policy for the workload evaluator.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthPolicyConfig {
    /// Reasons that make a `Warning` event fail the check.
    pub escalated_warning_reasons: Vec<String>,

    /// Fail when the workload's `Available` condition is not `True`.
    pub require_available_condition: bool,
}

impl Default for HealthPolicyConfig {
    fn default() -> Self {
        Self {
            escalated_warning_reasons: vec!["BackOff".to_string(), "Unhealthy".to_string()],
            require_available_condition: false,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a whole inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
