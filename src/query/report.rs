//! JSON shapes returned by the query facade.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::health::probe::{ProbeOutcome, ProbeResult};
use crate::health::state::HealthStatus;
use crate::health::store::SystemStatus;

/// RFC 3339, UTC, millisecond precision.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Liveness of this service itself.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub service: String,
}

/// Overall status plus one status per target.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusReport {
    pub status: SystemStatus,
    pub timestamp: String,
    pub services: ServiceStatusMap,
}

/// `name -> status`, serialized as a JSON object in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStatusMap(pub Vec<(String, HealthStatus)>);

impl ServiceStatusMap {
    pub fn get(&self, name: &str) -> Option<HealthStatus> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }
}

impl Serialize for ServiceStatusMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, status) in &self.0 {
            map.serialize_entry(name, status)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub name: String,
    pub url: String,
    pub health_endpoint: String,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ServicesReport {
    pub services: Vec<ServiceSummary>,
}

/// Full record of a single target.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    pub name: String,
    pub url: String,
    pub health_endpoint: String,
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub last_checked_at: Option<String>,
    pub status_changed_at: Option<String>,
    pub last_outcome: Option<OutcomeView>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeView {
    pub observed_at: String,
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub latency_ms: u64,
}

impl From<&ProbeOutcome> for OutcomeView {
    fn from(outcome: &ProbeOutcome) -> Self {
        let (reason, detail) = match &outcome.result {
            ProbeResult::Down { reason } => (Some(reason.kind()), reason.detail()),
            _ => (None, None),
        };
        Self {
            observed_at: format_timestamp(outcome.observed_at),
            result: outcome.result.label(),
            reason,
            detail,
            latency_ms: outcome.latency_ms,
        }
    }
}
