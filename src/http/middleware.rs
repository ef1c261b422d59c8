//! Admission middleware for the component route.
//!
//! Runs the current [`FilterPipeline`](crate::security::FilterPipeline) and
//! either short-circuits with the stage's error response or forwards the
//! request, stamping the remaining rate-limit budget on the way out.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::response::apply_rate_limit_headers;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::rate_limit::RateLimitStatus;

pub async fn admission_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let admission = state.inner.load_full();

    if let Err(e) = admission.pipeline.run(&mut request) {
        let kind = e.kind();
        tracing::warn!(kind = %kind, path = %request.uri().path(), "Check request rejected");
        metrics::record_rejection(kind);
        return e.into_response();
    }

    let budget = request.extensions().get::<RateLimitStatus>().cloned();
    let mut response = next.run(request).await;
    if let Some(budget) = budget {
        apply_rate_limit_headers(response.headers_mut(), &budget);
    }
    response
}
