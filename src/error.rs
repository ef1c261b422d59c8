//! Error taxonomy for health checks.
//!
//! Every failure a check request can end in is a [`CheckError`]. Each
//! variant maps to exactly one [`ErrorKind`], and every kind maps to an HTTP
//! failure status at the boundary (see `http::response`).

use serde::Serialize;
use thiserror::Error;

use crate::security::rate_limit::RateLimitStatus;

/// Coarse classification of a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    InvalidCredential,
    RateLimited,
    WorkloadUnavailable,
    QueryFailed,
    NoInstancesAvailable,
    InstanceUnready,
    InstanceUnhealthyEvent,
    ControlPlaneUnreachable,
}

impl ErrorKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::InvalidCredential => "invalid_credential",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::WorkloadUnavailable => "workload_unavailable",
            ErrorKind::QueryFailed => "query_failed",
            ErrorKind::NoInstancesAvailable => "no_instances_available",
            ErrorKind::InstanceUnready => "instance_unready",
            ErrorKind::InstanceUnhealthyEvent => "instance_unhealthy_event",
            ErrorKind::ControlPlaneUnreachable => "control_plane_unreachable",
        }
    }

    /// Whether the kind is produced by the admission stages rather than the
    /// evaluator.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ErrorKind::MissingCredential | ErrorKind::InvalidCredential | ErrorKind::RateLimited
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by a control-plane query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlPlaneError {
    /// The requested object does not exist.
    #[error("{resource} {name:?} not found")]
    NotFound { resource: &'static str, name: String },

    /// The API server answered with a non-success status.
    #[error("API server returned {code}: {message}")]
    Status { code: u16, message: String },

    /// The request never produced an API response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A workload selector could not be turned into a label query.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// A terminal failure of a single check request.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("no credential supplied")]
    MissingCredential,

    #[error("credential does not match")]
    InvalidCredential,

    #[error("rate limit of {} requests per {}s exceeded", .0.limit, .0.period.as_secs())]
    RateLimited(RateLimitStatus),

    #[error("workload {name:?} is unavailable: {source}")]
    WorkloadUnavailable {
        name: String,
        #[source]
        source: ControlPlaneError,
    },

    #[error("workload {name:?} does not report Available=True")]
    WorkloadNotAvailable { name: String },

    #[error("failed to {operation}: {source}")]
    QueryFailed {
        operation: &'static str,
        #[source]
        source: ControlPlaneError,
    },

    #[error("workload {workload:?} has no instances")]
    NoInstancesAvailable { workload: String },

    #[error("instance {instance:?} is not ready")]
    InstanceUnready { instance: String },

    #[error("instance {instance:?} last event is {event_type}/{reason}: {message}")]
    InstanceUnhealthyEvent {
        instance: String,
        event_type: String,
        reason: String,
        message: String,
    },

    #[error("control plane unreachable: {0}")]
    ControlPlaneUnreachable(#[source] ControlPlaneError),
}

impl CheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckError::MissingCredential => ErrorKind::MissingCredential,
            CheckError::InvalidCredential => ErrorKind::InvalidCredential,
            CheckError::RateLimited(_) => ErrorKind::RateLimited,
            CheckError::WorkloadUnavailable { .. } | CheckError::WorkloadNotAvailable { .. } => {
                ErrorKind::WorkloadUnavailable
            }
            CheckError::QueryFailed { .. } => ErrorKind::QueryFailed,
            CheckError::NoInstancesAvailable { .. } => ErrorKind::NoInstancesAvailable,
            CheckError::InstanceUnready { .. } => ErrorKind::InstanceUnready,
            CheckError::InstanceUnhealthyEvent { .. } => ErrorKind::InstanceUnhealthyEvent,
            CheckError::ControlPlaneUnreachable(_) => ErrorKind::ControlPlaneUnreachable,
        }
    }
}

/// Binary outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthVerdict {
    pub healthy: bool,
    pub reason: Option<ErrorKind>,
}

impl HealthVerdict {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            reason: None,
        }
    }

    pub fn failed(kind: ErrorKind) -> Self {
        Self {
            healthy: false,
            reason: Some(kind),
        }
    }
}

impl<T> From<&Result<T, CheckError>> for HealthVerdict {
    fn from(result: &Result<T, CheckError>) -> Self {
        match result {
            Ok(_) => HealthVerdict::healthy(),
            Err(e) => HealthVerdict::failed(e.kind()),
        }
    }
}

/// Result type for check operations.
pub type CheckResult<T> = Result<T, CheckError>;
