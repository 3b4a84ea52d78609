//! Target health state machine.
//!
//! # States
//! - Unknown: never probed successfully or unsuccessfully enough (and all internal targets)
//! - Healthy: last probe succeeded
//! - Unhealthy: at least `failure_threshold` consecutive failed probes
//!
//! # State Transitions
//! ```text
//! any       → Healthy:   one successful probe (failure counter reset to 0)
//! any       → Unhealthy: consecutive failures >= failure_threshold
//! otherwise: status unchanged, failure counter incremented
//! ```
//!
//! # Design Decisions
//! - Records are immutable values; an update produces a new record
//! - Debounce applies to failures only, recovery is immediate
//! - Not-applicable outcomes never change a record

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::health::probe::{ProbeOutcome, ProbeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status change produced by applying an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthStatus,
    pub to: HealthStatus,
}

/// Latest known health of one target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetHealth {
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub last_checked_at: Option<DateTime<Utc>>,
    /// When `status` last changed. `None` while still unknown.
    pub status_changed_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<ProbeOutcome>,
}

impl TargetHealth {
    /// Fresh record for a target that has not been probed.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Compute the record that results from `outcome`.
    ///
    /// Returns `None` when the outcome does not affect the record.
    pub fn apply(
        &self,
        outcome: &ProbeOutcome,
        failure_threshold: u32,
    ) -> Option<(TargetHealth, Option<Transition>)> {
        let (status, consecutive_failures) = match &outcome.result {
            ProbeResult::NotApplicable => return None,
            ProbeResult::Up => (HealthStatus::Healthy, 0),
            ProbeResult::Down { .. } => {
                let failures = self.consecutive_failures.saturating_add(1);
                if failures >= failure_threshold {
                    (HealthStatus::Unhealthy, failures)
                } else {
                    (self.status, failures)
                }
            }
        };

        let transition = (status != self.status).then_some(Transition {
            from: self.status,
            to: status,
        });

        let next = TargetHealth {
            status,
            consecutive_failures,
            last_checked_at: Some(outcome.observed_at),
            status_changed_at: if transition.is_some() {
                Some(outcome.observed_at)
            } else {
                self.status_changed_at
            },
            last_outcome: Some(outcome.clone()),
        };

        Some((next, transition))
    }
}
