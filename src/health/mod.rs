//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler.rs:
//!     Per-target timer
//!     → probe.rs (one request, bounded by the target's timeout)
//!     → store.rs update (state.rs computes the next record)
//!
//! query layer:
//!     → store.rs snapshot (lock-free, one atomic load per target)
//!
//! State machine (state.rs):
//!     Unknown → Healthy ←→ Unhealthy
//!     With a failure threshold to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Health state is per-target; there is no cross-target lock
//! - State transitions on failure require consecutive failures
//! - Internal targets are registered but never probed

pub mod probe;
pub mod scheduler;
pub mod state;
pub mod store;

pub use probe::{DownReason, HttpProber, ProbeOutcome, ProbeResult, Prober};
pub use scheduler::{PollScheduler, SchedulerHandle};
pub use state::{HealthStatus, TargetHealth, Transition};
pub use store::{StatusSnapshot, StatusStore, StoreError, SystemStatus};
