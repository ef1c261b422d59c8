//! Ordered request filtering.
//!
//! Gating stages run in a fixed order and the first failure short-circuits
//! the rest. A stage that never runs has no side effects, so a request
//! without a valid credential never consumes rate-limit budget.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::config::HeartbeatConfig;
use crate::error::CheckError;
use crate::security::credentials::CredentialGate;
use crate::security::rate_limit::{AdmissionLimiter, FixedWindowLimiter};

/// A single gating stage.
pub trait RequestFilter: Send + Sync + std::fmt::Debug {
    /// Stage name for logs.
    fn name(&self) -> &'static str;

    /// Inspect (and optionally annotate) the request. `Err` stops the pipeline.
    fn apply(&self, request: &mut Request<Body>) -> Result<(), CheckError>;
}

/// Stages applied in insertion order.
#[derive(Debug, Default)]
pub struct FilterPipeline {
    stages: Vec<Box<dyn RequestFilter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage after the existing ones.
    pub fn with(mut self, stage: impl RequestFilter + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Credential gate, then (when a limiter is given) admission limiter.
    pub fn standard(config: &HeartbeatConfig, limiter: Option<Arc<FixedWindowLimiter>>) -> Self {
        let pipeline = Self::new().with(CredentialGate::new(config.auth.token.clone()));
        match limiter {
            Some(limiter) => pipeline.with(AdmissionLimiter::new(limiter)),
            None => pipeline,
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, request: &mut Request<Body>) -> Result<(), CheckError> {
        for stage in &self.stages {
            if let Err(e) = stage.apply(request) {
                tracing::debug!(stage = stage.name(), kind = %e.kind(), "Request rejected");
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitKey;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl RequestFilter for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn apply(&self, _request: &mut Request<Body>) -> Result<(), CheckError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/healthz/default/component/api");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn rejection_short_circuits_later_stages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = FilterPipeline::new()
            .with(CredentialGate::new("test"))
            .with(Counting {
                calls: calls.clone(),
            });

        let err = pipeline.run(&mut request(None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        pipeline.run(&mut request(Some("Basic dGVzdA=="))).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bad_credentials_do_not_spend_budget() {
        let limiter = Arc::new(FixedWindowLimiter::new(
            1,
            Duration::from_secs(60),
            RateLimitKey::Global,
        ));
        let mut config = HeartbeatConfig::default();
        config.auth.token = "test".into();
        let pipeline = FilterPipeline::standard(&config, Some(limiter));
        assert_eq!(pipeline.stage_names(), vec!["credential_gate", "admission_limiter"]);

        for _ in 0..3 {
            let err = pipeline.run(&mut request(Some("Basic wrong"))).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidCredential);
        }

        pipeline.run(&mut request(Some("Basic test"))).unwrap();
        let err = pipeline.run(&mut request(Some("Basic test"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn limiter_stage_is_optional() {
        let pipeline = FilterPipeline::standard(&HeartbeatConfig::default(), None);
        assert_eq!(pipeline.stage_names(), vec!["credential_gate"]);
    }
}
