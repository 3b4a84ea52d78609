//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Registry → Store → Pollers → HTTP listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Stop pollers + drain HTTP → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then polling, then listeners
//! - Shutdown has timeout: forced abort after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, start_with_prober, RunningService, StartupError};
