//! Configuration loading from disk and the process environment.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the listen port.
pub const ENV_PORT: &str = "PORT";
/// Environment variable overriding the log output format.
pub const ENV_LOG_FORMAT: &str = "STATUS_LOG_FORMAT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}='{value}': {reason}")]
    Env {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the effective configuration: file (or built-in defaults), then
/// environment overrides, then validation.
pub fn resolve_config<F>(path: Option<&Path>, env: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `PORT` and `STATUS_LOG_FORMAT` on top of a parsed config.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env(ENV_PORT) {
        let port: u16 = value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
            name: ENV_PORT,
            value: value.clone(),
            reason: e.to_string(),
        })?;
        let ip = config
            .listener
            .bind_address
            .parse::<SocketAddr>()
            .map(|addr| addr.ip())
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));
        config.listener.bind_address = SocketAddr::new(ip, port).to_string();
    }

    if let Some(value) = env(ENV_LOG_FORMAT) {
        config.observability.log_format =
            value.parse::<LogFormat>().map_err(|reason| ConfigError::Env {
                name: ENV_LOG_FORMAT,
                value: value.clone(),
                reason,
            })?;
    }

    Ok(())
}
