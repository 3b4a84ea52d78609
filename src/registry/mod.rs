//! Target registry.
//!
//! # Responsibilities
//! - Turn validated `TargetConfig` entries into immutable `TargetSpec`s
//! - Preserve declaration order (it is the display order everywhere)
//! - Reject duplicate names and malformed URLs
//!
//! # Design Decisions
//! - Loaded once at startup; no add/remove afterwards
//! - Specs are shared as `Arc<TargetSpec>` with the store and pollers

pub mod target;

use std::sync::Arc;
use std::time::Duration;

use crate::config::loader::ConfigError;
use crate::config::schema::ServiceConfig;
use crate::config::validation::{check_base_url, validate_targets, ValidationError};

pub use target::{HttpEndpoint, Reachability, TargetSpec};

/// The fixed set of monitored targets.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<Arc<TargetSpec>>,
}

impl TargetRegistry {
    /// Build the registry from configuration.
    pub fn load(config: &ServiceConfig) -> Result<Self, ConfigError> {
        validate_targets(config).map_err(ConfigError::Validation)?;

        let defaults = &config.defaults;
        let mut targets = Vec::with_capacity(config.targets.len());

        for target in &config.targets {
            let name = target.name.trim().to_string();
            let reachability = match target.base_url() {
                None => Reachability::Internal,
                Some(raw) => {
                    let malformed = |reason: String| {
                        ConfigError::Validation(vec![ValidationError::MalformedUrl {
                            name: name.clone(),
                            url: raw.to_string(),
                            reason,
                        }])
                    };
                    let base = check_base_url(raw).map_err(&malformed)?;
                    let endpoint = HttpEndpoint::new(base, target.effective_health_path(defaults))
                        .map_err(|e| malformed(e.to_string()))?;
                    Reachability::Http(endpoint)
                }
            };

            targets.push(Arc::new(TargetSpec {
                name,
                reachability,
                poll_interval: Duration::from_millis(target.effective_interval_ms(defaults)),
                timeout: Duration::from_millis(target.effective_timeout_ms(defaults)),
                failure_threshold: target.effective_threshold(defaults),
            }));
        }

        tracing::debug!(
            targets = targets.len(),
            pollable = targets.iter().filter(|t| t.is_pollable()).count(),
            "Target registry loaded"
        );

        Ok(Self { targets })
    }

    /// All targets in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TargetSpec>> {
        self.targets.iter()
    }

    /// Targets that get a polling loop.
    pub fn pollable(&self) -> impl Iterator<Item = &Arc<TargetSpec>> {
        self.targets.iter().filter(|t| t.is_pollable())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TargetSpec>> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
