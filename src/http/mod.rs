//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span, timeout, CORS)
//!     → /healthz                        → handlers::liveness_handler
//!     → /api/healthz/{ns}/component/{c} → middleware.rs (credential gate, limiter)
//!                                       → handlers::component_handler
//!     → response.rs (status mapping, rate-limit headers)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
pub use server::{AdmissionState, AppState, HttpServer};
