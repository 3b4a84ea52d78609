//! Read-only query facade over the status store.
//!
//! # Responsibilities
//! - Build the `/health`, `/status`, `/services` and `/services/{name}` views
//! - Never mutate state; every call works from one store snapshot

pub mod report;

use chrono::Utc;
use std::sync::Arc;

use crate::health::store::{SnapshotEntry, StatusStore};
use crate::registry::Reachability;

pub use report::{
    format_timestamp, HealthReport, OutcomeView, ServiceDetail, ServiceStatusMap, ServiceSummary,
    ServicesReport, StatusReport,
};

#[derive(Debug, Clone)]
pub struct QueryFacade {
    store: Arc<StatusStore>,
    service_name: Arc<str>,
}

impl QueryFacade {
    pub fn new(store: Arc<StatusStore>, service_name: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            service_name: service_name.into(),
        }
    }

    /// Liveness of this service. Independent of any target.
    pub fn get_health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            timestamp: format_timestamp(Utc::now()),
            service: self.service_name.to_string(),
        }
    }

    pub fn get_status(&self) -> StatusReport {
        let snapshot = self.store.snapshot();
        StatusReport {
            status: snapshot.system_status(),
            timestamp: format_timestamp(snapshot.taken_at),
            services: ServiceStatusMap(
                snapshot
                    .iter()
                    .map(|e| (e.spec.name.clone(), e.health.status))
                    .collect(),
            ),
        }
    }

    pub fn get_services(&self) -> ServicesReport {
        let snapshot = self.store.snapshot();
        ServicesReport {
            services: snapshot.iter().map(summary).collect(),
        }
    }

    /// Detailed record of one target, `None` if it is not registered.
    pub fn get_service(&self, name: &str) -> Option<ServiceDetail> {
        let snapshot = self.store.snapshot();
        snapshot.get(name).map(detail)
    }
}

fn summary(entry: &SnapshotEntry) -> ServiceSummary {
    ServiceSummary {
        name: entry.spec.name.clone(),
        url: entry.spec.display_url().to_string(),
        health_endpoint: entry.spec.display_health_endpoint().to_string(),
        status: entry.health.status,
    }
}

fn detail(entry: &SnapshotEntry) -> ServiceDetail {
    let spec = &entry.spec;
    let health = &entry.health;
    let (poll_interval_ms, timeout_ms) = match spec.reachability {
        Reachability::Http(_) => (
            Some(spec.poll_interval.as_millis() as u64),
            Some(spec.timeout.as_millis() as u64),
        ),
        Reachability::Internal => (None, None),
    };

    ServiceDetail {
        name: spec.name.clone(),
        url: spec.display_url().to_string(),
        health_endpoint: spec.display_health_endpoint().to_string(),
        status: health.status,
        consecutive_failures: health.consecutive_failures,
        failure_threshold: spec.failure_threshold,
        poll_interval_ms,
        timeout_ms,
        last_checked_at: health.last_checked_at.map(format_timestamp),
        status_changed_at: health.status_changed_at.map(format_timestamp),
        last_outcome: health.last_outcome.as_ref().map(OutcomeView::from),
    }
}
