//! Fixed-window admission limiter.
//!
//! Bounds the number of admitted check requests to `limit` per `period`,
//! either globally or per peer address. The decision happens before any
//! control-plane query is issued.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use dashmap::DashMap;

use crate::config::{RateLimitConfig, RateLimitKey};
use crate::error::CheckError;
use crate::security::pipeline::RequestFilter;

const GLOBAL_BUCKET: &str = "global";

/// Budget left in the caller's current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub remaining: u64,
    pub period: Duration,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

impl RateLimitStatus {
    /// Unix timestamp (seconds) at which the current window closes.
    pub fn reset_at_unix(&self) -> u64 {
        (SystemTime::now() + self.reset_after)
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub status: RateLimitStatus,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u64,
}

/// Counting state shared by every request.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u64,
    period: Duration,
    key: RateLimitKey,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u64, period: Duration, key: RateLimitKey) -> Self {
        Self {
            limit,
            period,
            key,
            windows: DashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.limit, config.period(), config.key)
    }

    /// Whether this limiter already enforces `config`.
    pub fn matches_config(&self, config: &RateLimitConfig) -> bool {
        self.limit == config.limit && self.period == config.period() && self.key == config.key
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Count one request against `key` at `now`.
    ///
    /// The bucket entry stays locked for the whole check-and-increment, so
    /// concurrent callers can never admit more than `limit` per window.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window {
                started: now,
                count: 0,
            });
        let window = entry.value_mut();

        if now.saturating_duration_since(window.started) >= self.period {
            window.started = now;
            window.count = 0;
        }

        let allowed = window.count < self.limit;
        if allowed {
            window.count += 1;
        }

        let elapsed = now.saturating_duration_since(window.started);
        RateLimitDecision {
            allowed,
            status: RateLimitStatus {
                limit: self.limit,
                remaining: self.limit - window.count,
                period: self.period,
                reset_after: self.period.saturating_sub(elapsed),
            },
        }
    }

    /// Drop buckets whose window has closed. Returns how many were removed.
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.period);
        before - self.windows.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.windows.len()
    }

    fn bucket_key(&self, request: &Request<Body>) -> String {
        match self.key {
            RateLimitKey::Global => GLOBAL_BUCKET.to_string(),
            RateLimitKey::Client => request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Pipeline stage wrapping a shared limiter.
#[derive(Debug, Clone)]
pub struct AdmissionLimiter {
    limiter: Arc<FixedWindowLimiter>,
}

impl AdmissionLimiter {
    pub fn new(limiter: Arc<FixedWindowLimiter>) -> Self {
        Self { limiter }
    }
}

impl RequestFilter for AdmissionLimiter {
    fn name(&self) -> &'static str {
        "admission_limiter"
    }

    fn apply(&self, request: &mut Request<Body>) -> Result<(), CheckError> {
        let key = self.limiter.bucket_key(request);
        let decision = self.limiter.check(&key);

        if decision.allowed {
            request.extensions_mut().insert(decision.status);
            Ok(())
        } else {
            tracing::warn!(client = %key, limit = decision.status.limit, "Rate limit exceeded");
            Err(CheckError::RateLimited(decision.status))
        }
    }
}
