//! Mapping check outcomes to HTTP responses.
//!
//! | Kind                     | Status |
//! |--------------------------|--------|
//! | MissingCredential        | 401 + `WWW-Authenticate: Basic` |
//! | InvalidCredential        | 403    |
//! | RateLimited              | 429 + `X-RateLimit-*` |
//! | every evaluator failure  | 500, empty body |
//!
//! Failure detail is logged by the caller, never sent to the client.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::{CheckError, ErrorKind};
use crate::security::rate_limit::RateLimitStatus;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

const AUTHORIZATION_FAILED: &str = "authorization failed";
const LIMIT_EXCEEDED: &str = "Limit exceeded";

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::MissingCredential => StatusCode::UNAUTHORIZED,
            ErrorKind::InvalidCredential => StatusCode::FORBIDDEN,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::WorkloadUnavailable
            | ErrorKind::QueryFailed
            | ErrorKind::NoInstancesAvailable
            | ErrorKind::InstanceUnready
            | ErrorKind::InstanceUnhealthyEvent
            | ErrorKind::ControlPlaneUnreachable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Write the limiter's budget into response headers.
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(status.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(status.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(status.reset_at_unix()));
}

impl IntoResponse for CheckError {
    fn into_response(self) -> Response {
        let status = self.kind().status_code();
        match self {
            CheckError::MissingCredential => (
                status,
                [(header::WWW_AUTHENTICATE, "Basic")],
                AUTHORIZATION_FAILED,
            )
                .into_response(),
            CheckError::RateLimited(budget) => {
                let mut response = (status, LIMIT_EXCEEDED).into_response();
                apply_rate_limit_headers(response.headers_mut(), &budget);
                response
            }
            _ => status.into_response(),
        }
    }
}
