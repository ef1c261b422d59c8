//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with both health routes
//! - Wire up middleware (tracing, request ID, timeout, CORS, admission)
//! - Own the hot-swappable admission state
//! - Run background maintenance (limiter pruning, config reload)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HeartbeatConfig;
use crate::health::HealthChecker;
use crate::http::handlers::{component_handler, liveness_handler};
use crate::http::middleware::admission_middleware;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::ShutdownSignal;
use crate::security::{FilterPipeline, FixedWindowLimiter};

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Everything the admission middleware needs, swapped as a unit on reload.
#[derive(Debug)]
pub struct AdmissionState {
    pub config: HeartbeatConfig,
    pub pipeline: FilterPipeline,
    pub limiter: Option<Arc<FixedWindowLimiter>>,
}

impl AdmissionState {
    /// Build from `config`, reusing `previous`'s limiter counters when the
    /// limiter settings did not change.
    pub fn build(config: HeartbeatConfig, previous: Option<&AdmissionState>) -> Self {
        let limiter = config.rate_limit.enabled.then(|| {
            previous
                .and_then(|p| p.limiter.clone())
                .filter(|l| l.matches_config(&config.rate_limit))
                .unwrap_or_else(|| Arc::new(FixedWindowLimiter::from_config(&config.rate_limit)))
        });
        let pipeline = FilterPipeline::standard(&config, limiter.clone());

        Self {
            config,
            pipeline,
            limiter,
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<AdmissionState>>,
    pub checker: Arc<dyn HealthChecker>,
}

impl AppState {
    pub fn new(config: HeartbeatConfig, checker: Arc<dyn HealthChecker>) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(AdmissionState::build(config, None))),
            checker,
        }
    }

    /// Swap in a reloaded configuration.
    pub fn apply_config(&self, config: HeartbeatConfig) {
        let current = self.inner.load_full();
        if current.config.listener != config.listener || current.config.timeouts != config.timeouts
        {
            tracing::warn!("Listener and timeout changes take effect after a restart");
        }
        if current.config.health != config.health
            || current.config.control_plane != config.control_plane
        {
            tracing::warn!("Health policy and control plane changes take effect after a restart");
        }

        let next = AdmissionState::build(config, Some(&current));
        let limiter_reset = match (&current.limiter, &next.limiter) {
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            (old, new) => old.is_some() != new.is_some(),
        };
        tracing::info!(
            stages = ?next.pipeline.stage_names(),
            limiter_reset,
            "Admission configuration reloaded"
        );
        self.inner.store(Arc::new(next));
    }
}

/// HTTP server for the heartbeat endpoints.
pub struct HttpServer {
    router: Router,
    config: HeartbeatConfig,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: HeartbeatConfig, checker: Arc<dyn HealthChecker>) -> Self {
        let state = AppState::new(config.clone(), checker);
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HeartbeatConfig, state: AppState) -> Router {
        let gated = Router::new()
            .route(
                "/api/healthz/{namespace}/component/{component}",
                get(component_handler),
            )
            .route(
                "/api/healthz/{namespace}/deployment/{component}",
                get(component_handler),
            )
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                admission_middleware,
            ));

        Router::new()
            .route("/healthz", get(liveness_handler))
            .merge(gated)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
            .layer(CorsLayer::new().allow_origin(Any))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<HeartbeatConfig>,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload_state = self.state.clone();
        let mut reload_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => reload_state.apply_config(config),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        let prune_state = self.state.clone();
        let mut prune_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(limiter) = prune_state.inner.load().limiter.as_ref() {
                            let removed = limiter.prune(Instant::now());
                            if removed > 0 {
                                tracing::debug!(removed, "Pruned idle rate-limit buckets");
                            }
                        }
                    }
                    _ = prune_shutdown.recv() => break,
                }
            }
        });

        tracing::info!(
            rate_limit = self.config.rate_limit.enabled,
            limit = self.config.rate_limit.limit,
            period_secs = self.config.rate_limit.period_secs,
            "Serving health checks"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let mut server_shutdown = shutdown;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CheckError, CheckResult, ControlPlaneError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct StaticChecker {
        healthy: bool,
    }

    #[async_trait]
    impl HealthChecker for StaticChecker {
        async fn check_component(&self, _namespace: &str, component: &str) -> CheckResult<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(CheckError::NoInstancesAvailable {
                    workload: component.to_string(),
                })
            }
        }

        async fn ping(&self) -> CheckResult<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(CheckError::ControlPlaneUnreachable(
                    ControlPlaneError::Transport("refused".into()),
                ))
            }
        }
    }

    fn config() -> HeartbeatConfig {
        let mut config = HeartbeatConfig::default();
        config.auth.token = "test".to_string();
        config
    }

    #[test]
    fn reload_reuses_limiter_when_limits_unchanged() {
        let first = AdmissionState::build(config(), None);

        let mut rotated = config();
        rotated.auth.token = "other".to_string();
        let second = AdmissionState::build(rotated.clone(), Some(&first));
        assert!(Arc::ptr_eq(
            first.limiter.as_ref().unwrap(),
            second.limiter.as_ref().unwrap()
        ));

        rotated.rate_limit.limit = 10;
        let third = AdmissionState::build(rotated.clone(), Some(&second));
        assert!(!Arc::ptr_eq(
            second.limiter.as_ref().unwrap(),
            third.limiter.as_ref().unwrap()
        ));

        rotated.rate_limit.enabled = false;
        let fourth = AdmissionState::build(rotated, Some(&third));
        assert!(fourth.limiter.is_none());
        assert_eq!(fourth.pipeline.stage_names(), vec!["credential_gate"]);
    }

    #[tokio::test]
    async fn router_maps_outcomes() {
        let server = HttpServer::new(config(), Arc::new(StaticChecker { healthy: false }));

        let res = server
            .router
            .clone()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = server
            .router
            .clone()
            .oneshot(
                Request::get("/api/healthz/default/component/api")
                    .header("authorization", "Basic test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.headers().contains_key("x-ratelimit-remaining"));
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn apply_config_swaps_pipeline() {
        let state = AppState::new(config(), Arc::new(StaticChecker { healthy: true }));
        let mut next = config();
        next.rate_limit.enabled = false;

        state.apply_config(next);

        let current = state.inner.load();
        assert!(current.limiter.is_none());
        assert!(!current.config.rate_limit.enabled);
    }
}
