//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to the
//! whole process. Unknown levels fall back to `info`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Normalize a configured level name (`INFO`, `Warning`, ...).
pub fn normalize_level(raw: &str) -> &'static str {
    let lower = raw.trim().to_ascii_lowercase();
    let lower = match lower.as_str() {
        "warning" => "warn",
        "fatal" | "panic" => "error",
        other => other,
    };
    LEVELS
        .into_iter()
        .find(|l| *l == lower)
        .unwrap_or("info")
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(config: &ObservabilityConfig) {
    let level = normalize_level(&config.log_level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},tower_http={level}")));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
