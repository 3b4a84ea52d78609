//! Status store.
//!
//! # Responsibilities
//! - Hold exactly one `TargetHealth` record per registered target
//! - Apply probe outcomes to the matching record
//! - Hand out point-in-time snapshots for the query layer
//!
//! # Design Decisions
//! - One `ArcSwap` slot per target: writers to different targets never contend
//! - Records are swapped whole, so readers see either the old or the new
//!   record and never a mix of the two
//! - Readers never take a lock; a snapshot is one atomic load per target
//! - The slot table is built once and never resized

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::health::probe::ProbeOutcome;
use crate::health::state::{HealthStatus, TargetHealth, Transition};
use crate::registry::{TargetRegistry, TargetSpec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("target '{0}' is not registered")]
    UnknownTarget(String),
}

/// Overall status derived from all records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Operational,
    Degraded,
}

#[derive(Debug)]
struct Slot {
    spec: Arc<TargetSpec>,
    health: ArcSwap<TargetHealth>,
}

/// Per-target health records, partitioned by name.
#[derive(Debug)]
pub struct StatusStore {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl StatusStore {
    /// Create a store with every target in `unknown` state.
    pub fn new(registry: &TargetRegistry) -> Self {
        let slots: Vec<Slot> = registry
            .iter()
            .map(|spec| Slot {
                spec: spec.clone(),
                health: ArcSwap::from_pointee(TargetHealth::unknown()),
            })
            .collect();
        let index = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.spec.name.clone(), i))
            .collect();
        Self { slots, index }
    }

    /// Apply an outcome to the record of `name`.
    ///
    /// Returns the status transition, if the outcome caused one.
    pub fn update(
        &self,
        name: &str,
        outcome: &ProbeOutcome,
    ) -> Result<Option<Transition>, StoreError> {
        let slot = self
            .index
            .get(name)
            .map(|&i| &self.slots[i])
            .ok_or_else(|| StoreError::UnknownTarget(name.to_string()))?;

        let threshold = slot.spec.failure_threshold;
        let mut transition = None;
        // One writer per target makes the retry path of rcu unreachable in
        // practice; it still keeps concurrent writers correct.
        slot.health.rcu(|current| {
            match current.apply(outcome, threshold) {
                Some((next, t)) => {
                    transition = t;
                    Arc::new(next)
                }
                None => {
                    transition = None;
                    Arc::clone(current)
                }
            }
        });
        Ok(transition)
    }

    /// Current record of one target.
    pub fn get(&self, name: &str) -> Option<Arc<TargetHealth>> {
        self.index.get(name).map(|&i| self.slots[i].health.load_full())
    }

    /// Copy every record, in registry order.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            taken_at: Utc::now(),
            entries: self
                .slots
                .iter()
                .map(|slot| SnapshotEntry {
                    spec: slot.spec.clone(),
                    health: slot.health.load_full(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub spec: Arc<TargetSpec>,
    pub health: Arc<TargetHealth>,
}

/// Records of all targets at one instant.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<SnapshotEntry>,
}

impl StatusSnapshot {
    /// `degraded` iff some pollable target is unhealthy.
    pub fn system_status(&self) -> SystemStatus {
        let degraded = self
            .entries
            .iter()
            .any(|e| e.spec.is_pollable() && e.health.status == HealthStatus::Unhealthy);
        if degraded {
            SystemStatus::Degraded
        } else {
            SystemStatus::Operational
        }
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|e| e.spec.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter()
    }
}
