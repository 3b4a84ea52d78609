//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the status
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Literal used in place of a URL for targets that cannot be polled.
pub const INTERNAL_MARKER: &str = "internal";

/// Root configuration for the status service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name this service reports about itself on `/health`.
    pub service_name: String,

    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Polling parameters applied to targets that leave them unset.
    pub defaults: PollDefaults,

    /// Monitored services, in display order.
    pub targets: Vec<TargetConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "status-service".to_string(),
            listener: ListenerConfig::default(),
            defaults: PollDefaults::default(),
            targets: default_targets(),
            observability: ObservabilityConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

/// The pipeline services monitored when no config file is supplied.
fn default_targets() -> Vec<TargetConfig> {
    vec![
        TargetConfig::http("consumer-processor", "http://consumer-processor:8080"),
        TargetConfig::http("entity-queue-producer", "http://entity-queue-producer:8081"),
        TargetConfig::internal("consumer-processor-crdt"),
        TargetConfig::internal("consumer-processor-optimizer"),
        TargetConfig::internal("consumer-processor-godot"),
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8082").
    pub bind_address: String,

    /// Upper bound on handling a single API request, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8082".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Default polling parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollDefaults {
    /// Interval between two probes of the same target.
    pub poll_interval_ms: u64,

    /// Deadline for a single probe.
    pub timeout_ms: u64,

    /// Number of consecutive failures before marking unhealthy.
    pub failure_threshold: u32,

    /// Path appended to a target's base URL.
    pub health_path: String,
}

impl Default for PollDefaults {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            timeout_ms: 5_000,
            failure_threshold: 3,
            health_path: "/health".to_string(),
        }
    }
}

/// A monitored service as written in the config file.
///
/// `url` is either an http(s) base URL or the literal `"internal"`; leaving
/// it out also means internal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Unique target identifier.
    pub name: String,

    /// Base URL, or `"internal"`.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub health_path: Option<String>,

    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub failure_threshold: Option<u32>,
}

impl TargetConfig {
    /// A network-reachable target using the default polling parameters.
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            health_path: None,
            poll_interval_ms: None,
            timeout_ms: None,
            failure_threshold: None,
        }
    }

    /// A target that is tracked but never polled.
    pub fn internal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            health_path: None,
            poll_interval_ms: None,
            timeout_ms: None,
            failure_threshold: None,
        }
    }

    /// Returns the configured base URL, or `None` for internal targets.
    pub fn base_url(&self) -> Option<&str> {
        match self.url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(url) if url.eq_ignore_ascii_case(INTERNAL_MARKER) => None,
            Some(url) => Some(url),
        }
    }

    pub fn effective_health_path<'a>(&'a self, defaults: &'a PollDefaults) -> &'a str {
        self.health_path.as_deref().unwrap_or(&defaults.health_path)
    }

    pub fn effective_interval_ms(&self, defaults: &PollDefaults) -> u64 {
        self.poll_interval_ms.unwrap_or(defaults.poll_interval_ms)
    }

    pub fn effective_timeout_ms(&self, defaults: &PollDefaults) -> u64 {
        self.timeout_ms.unwrap_or(defaults.timeout_ms)
    }

    pub fn effective_threshold(&self, defaults: &PollDefaults) -> u32 {
        self.failure_threshold.unwrap_or(defaults.failure_threshold)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShutdownConfig {
    /// How long background tasks get to finish before being aborted.
    pub grace_period_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_period_ms: 5_000 }
    }
}
