//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → optional TOML file (--config / HEARTBEAT_CONFIG)
//!     → environment overrides (PORT, AUTH_TOKEN_BASIC, RATE_LIMIT, ...)
//!     → validation.rs (semantic checks)
//!     → HeartbeatConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs reloads file + environment
//!     → validation.rs validates
//!     → server swaps its admission state atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults so an empty environment still starts
//! - A reload that fails validation leaves the running config untouched

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    AuthConfig, ControlPlaneConfig, HealthPolicyConfig, HeartbeatConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, RateLimitConfig, RateLimitKey, TimeoutConfig,
};
