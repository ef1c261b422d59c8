//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming check request:
//!     → credentials.rs (shared-secret check: 401 / 403)
//!     → rate_limit.rs (fixed-window admission: 429)
//!     → Pass to the workload evaluator
//! ```
//!
//! `pipeline.rs` owns the ordering; each stage can short-circuit.
//!
//! # Design Decisions
//! - Fail closed: reject on any gate failure
//! - Stages are synchronous and never touch the control plane
//! - Liveness (`/healthz`) bypasses the pipeline entirely

pub mod credentials;
pub mod pipeline;
pub mod rate_limit;

pub use credentials::{extract_credential, CredentialGate, PresentedCredential};
pub use pipeline::{FilterPipeline, RequestFilter};
pub use rate_limit::{AdmissionLimiter, FixedWindowLimiter, RateLimitDecision, RateLimitStatus};
