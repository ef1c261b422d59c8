//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All errors are
//! collected so an operator sees every problem in one pass.

use std::net::SocketAddr;

use crate::config::schema::HeartbeatConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &HeartbeatConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }

    if config.auth.token.is_empty() {
        errors.push(ValidationError::new("auth.token", "must not be empty"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.limit == 0 {
            errors.push(ValidationError::new("rate_limit.limit", "must be greater than 0"));
        }
        if config.rate_limit.period_secs == 0 {
            errors.push(ValidationError::new(
                "rate_limit.period_secs",
                "must be greater than 0",
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "{:?} is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&HeartbeatConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = HeartbeatConfig::default();
        config.auth.token.clear();
        config.rate_limit.limit = 0;
        config.rate_limit.period_secs = 0;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "auth.token",
                "rate_limit.limit",
                "rate_limit.period_secs",
            ]
        );
    }

    #[test]
    fn disabled_limiter_skips_quota_checks() {
        let mut config = HeartbeatConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.limit = 0;
        assert!(validate_config(&config).is_ok());
    }
}
