//! Monitored target definitions.

use std::time::Duration;
use url::Url;

use crate::config::schema::INTERNAL_MARKER;

/// How a target can be reached for probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// Polled over HTTP.
    Http(HttpEndpoint),
    /// Tracked, never polled. Status stays `unknown`.
    Internal,
}

/// A health endpoint: base URL plus path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpEndpoint {
    base_url: Url,
    health_path: String,
    health_url: Url,
}

impl HttpEndpoint {
    /// Build an endpoint from an already validated base URL.
    pub fn new(base_url: Url, health_path: &str) -> Result<Self, url::ParseError> {
        let health_url = Url::parse(&format!(
            "{}{}",
            base_url.as_str().trim_end_matches('/'),
            health_path
        ))?;
        Ok(Self {
            base_url,
            health_path: health_path.to_string(),
            health_url,
        })
    }

    /// Base URL as configured, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn health_path(&self) -> &str {
        &self.health_path
    }

    /// The URL a probe requests.
    pub fn health_url(&self) -> &Url {
        &self.health_url
    }
}

/// Immutable description of one monitored service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub name: String,
    pub reachability: Reachability,
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Consecutive failures before the target is reported unhealthy.
    pub failure_threshold: u32,
}

impl TargetSpec {
    pub fn is_pollable(&self) -> bool {
        matches!(self.reachability, Reachability::Http(_))
    }

    /// `url` field as rendered on `/services`.
    pub fn display_url(&self) -> &str {
        match &self.reachability {
            Reachability::Http(endpoint) => endpoint.base_url(),
            Reachability::Internal => INTERNAL_MARKER,
        }
    }

    /// `healthEndpoint` field as rendered on `/services`.
    pub fn display_health_endpoint(&self) -> &str {
        match &self.reachability {
            Reachability::Http(endpoint) => endpoint.health_path(),
            Reachability::Internal => INTERNAL_MARKER,
        }
    }
}
