//! Kubernetes component heartbeat library

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::HeartbeatConfig;
pub use error::{CheckError, CheckResult, ErrorKind, HealthVerdict};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
