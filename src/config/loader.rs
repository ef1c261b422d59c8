//! Configuration loading from disk and the environment.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::schema::{HeartbeatConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "HEARTBEAT_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("Validation failed: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without environment overrides or validation.
pub fn read_config_file(path: &Path) -> Result<HeartbeatConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<HeartbeatConfig, ConfigError> {
    let config = read_config_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the effective configuration: defaults, then the optional file, then
/// the process environment.
pub fn load(path: Option<&Path>) -> Result<HeartbeatConfig, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load`] with an explicit environment lookup.
pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<HeartbeatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match path {
        Some(p) => read_config_file(p)?,
        None => HeartbeatConfig::default(),
    };
    let config = apply_env(base, &env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// Variable names follow the deployment manifests: `KUBECONFIG`,
/// `LOG_LEVEL`, `PORT`, `RATE_LIMIT`, `RATE_LIMIT_PERIOD`, `AUTH_TOKEN_BASIC`.
pub fn apply_env<F>(mut config: HeartbeatConfig, env: &F) -> Result<HeartbeatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = non_empty(env("KUBECONFIG")) {
        let first = raw.split(':').find(|p| !p.is_empty()).unwrap_or(&raw);
        config.control_plane.kubeconfig = Some(PathBuf::from(expand_path(first, env)?));
    }

    if let Some(level) = non_empty(env("LOG_LEVEL")) {
        config.observability.log_level = level;
    }

    if let Some(format) = non_empty(env("LOG_FORMAT")) {
        config.observability.log_format = match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" | "text" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Env {
                    var: "LOG_FORMAT",
                    message: format!("unknown format {other:?}"),
                })
            }
        };
    }

    if let Some(port) = non_empty(env("PORT")) {
        let port: u16 = port.parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            message: format!("{port:?} is not a port number"),
        })?;
        config.listener.bind_address = with_port(&config.listener.bind_address, port);
    }

    if let Some(limit) = non_empty(env("RATE_LIMIT")) {
        config.rate_limit.limit = limit.parse().map_err(|_| ConfigError::Env {
            var: "RATE_LIMIT",
            message: format!("{limit:?} is not a request count"),
        })?;
    }

    if let Some(period) = non_empty(env("RATE_LIMIT_PERIOD")) {
        let duration = humantime::parse_duration(&period).map_err(|e| ConfigError::Env {
            var: "RATE_LIMIT_PERIOD",
            message: e.to_string(),
        })?;
        config.rate_limit.period_secs = duration.as_secs();
    }

    if let Some(token) = non_empty(env("AUTH_TOKEN_BASIC")) {
        config.auth.token = token;
    }

    if let Some(addr) = non_empty(env("METRICS_ADDRESS")) {
        config.observability.metrics_address = addr;
        config.observability.metrics_enabled = true;
    }

    Ok(config)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn with_port(bind_address: &str, port: u16) -> String {
    match bind_address.parse::<SocketAddr>() {
        Ok(mut addr) => {
            addr.set_port(port);
            addr.to_string()
        }
        Err(_) => format!("0.0.0.0:{port}"),
    }
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references in `KUBECONFIG`.
///
/// Unset variables and unterminated `${` references are errors.
fn expand_path<F>(raw: &str, env: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let invalid = |message: String| ConfigError::Env {
        var: "KUBECONFIG",
        message,
    };

    let expanded = shellexpand::full_with_context(
        raw,
        || env("HOME"),
        |name: &str| -> Result<Option<String>, String> {
            env(name).map(Some).ok_or_else(|| "variable is not set".to_string())
        },
    )
    .map_err(|e| invalid(e.to_string()))?;

    if expanded.contains("${") {
        return Err(invalid(format!("unterminated variable reference in {raw:?}")));
    }
    Ok(expanded.into_owned())
}
