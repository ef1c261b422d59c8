//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Component check (evaluator.rs):
//!     get workload
//!     → list instances by selector (types.rs renders the selector)
//!     → sampler.rs picks one instance
//!     → readiness of that instance
//!     → most recent event of that instance
//!     → verdict
//!
//! Liveness (evaluator.rs):
//!     ping the API server's /healthz
//! ```
//!
//! `control_plane.rs` is the query seam; `kubernetes.rs` implements it over
//! kube, tests implement it in memory.
//!
//! # Design Decisions
//! - One random instance per check keeps the query cost constant
//! - No caching: every check reads the API server's current view
//! - Fail closed: a missing Ready condition is not-ready

pub mod checker;
pub mod control_plane;
pub mod evaluator;
pub mod kubernetes;
pub mod sampler;
pub mod types;

pub use checker::HealthChecker;
pub use control_plane::ControlPlane;
pub use evaluator::{EvaluationPolicy, WorkloadEvaluator};
pub use kubernetes::KubeControlPlane;
pub use sampler::{FixedSampler, InstanceSampler, RandomSampler};
pub use types::{
    Condition, ConditionStatus, Instance, InstanceEvent, InstanceSelector, SelectorOperator,
    SelectorRequirement, WorkloadSnapshot,
};
