//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check target identity (names present and unique)
//! - Validate value ranges (intervals, timeouts, thresholds > 0)
//! - Validate URLs and listen addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{ServiceConfig, TargetConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("target #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("target name '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("target '{name}': malformed url '{url}': {reason}")]
    MalformedUrl {
        name: String,
        url: String,
        reason: String,
    },

    #[error("target '{name}': health path '{path}' must start with '/'")]
    InvalidHealthPath { name: String, path: String },

    #[error("target '{name}': {field} must be greater than zero")]
    ZeroValue { name: String, field: &'static str },

    #[error("target '{name}': timeout {timeout_ms}ms exceeds poll interval {interval_ms}ms")]
    TimeoutExceedsInterval {
        name: String,
        timeout_ms: u64,
        interval_ms: u64,
    },

    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("listener.request_timeout_ms must be greater than zero")]
    ZeroRequestTimeout,
}

/// Validate the whole configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.request_timeout_ms == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if let Err(mut target_errors) = validate_targets(config) {
        errors.append(&mut target_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the target list. Used by the registry loader.
pub fn validate_targets(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, target) in config.targets.iter().enumerate() {
        let name = target.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyName { index });
            continue;
        }
        if !seen.insert(name.to_string()) {
            errors.push(ValidationError::DuplicateName(name.to_string()));
        }
        validate_target(config, target, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_target(
    config: &ServiceConfig,
    target: &TargetConfig,
    errors: &mut Vec<ValidationError>,
) {
    // Internal targets carry no polling parameters worth checking.
    let Some(raw_url) = target.base_url() else {
        return;
    };
    let name = target.name.trim().to_string();
    let defaults = &config.defaults;

    if let Err(reason) = check_base_url(raw_url) {
        errors.push(ValidationError::MalformedUrl {
            name: name.clone(),
            url: raw_url.to_string(),
            reason,
        });
    }

    let path = target.effective_health_path(defaults);
    if !path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath {
            name: name.clone(),
            path: path.to_string(),
        });
    }

    let interval_ms = target.effective_interval_ms(defaults);
    let timeout_ms = target.effective_timeout_ms(defaults);
    let zero_checks = [
        ("poll_interval_ms", interval_ms == 0),
        ("timeout_ms", timeout_ms == 0),
        ("failure_threshold", target.effective_threshold(defaults) == 0),
    ];
    for (field, is_zero) in zero_checks {
        if is_zero {
            errors.push(ValidationError::ZeroValue { name: name.clone(), field });
        }
    }

    if interval_ms > 0 && timeout_ms > interval_ms {
        errors.push(ValidationError::TimeoutExceedsInterval {
            name,
            timeout_ms,
            interval_ms,
        });
    }
}

/// Parse a base URL and reject anything a health path cannot be appended to.
pub(crate) fn check_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("query and fragment are not allowed".to_string());
    }
    Ok(url)
}
