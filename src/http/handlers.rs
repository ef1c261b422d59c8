//! Route handlers.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::HealthVerdict;
use crate::http::server::AppState;
use crate::observability::metrics;

/// `GET|HEAD /api/healthz/{namespace}/component/{component}`
pub async fn component_handler(
    State(state): State<AppState>,
    Path((namespace, component)): Path<(String, String)>,
) -> Response {
    let start = Instant::now();
    let result = state.checker.check_component(&namespace, &component).await;
    let verdict = HealthVerdict::from(&result);
    metrics::record_check(&verdict, start);

    match result {
        Ok(()) => {
            tracing::info!(namespace = %namespace, component = %component, "Component healthy");
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::error!(
                namespace = %namespace,
                component = %component,
                kind = %e.kind(),
                error = %e,
                "Health check failed"
            );
            e.into_response()
        }
    }
}

/// `GET|HEAD /healthz`
pub async fn liveness_handler(State(state): State<AppState>) -> Response {
    let result = state.checker.ping().await;
    metrics::record_ping(&HealthVerdict::from(&result));

    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!(kind = %e.kind(), error = %e, "Liveness probe failed");
            e.into_response()
        }
    }
}
