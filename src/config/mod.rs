//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or built-in defaults
//!     → loader.rs (parse & deserialize, apply PORT / STATUS_LOG_FORMAT)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → registry::TargetRegistry::load
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the target set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, ConfigError};
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::PollDefaults;
pub use schema::ServiceConfig;
pub use schema::TargetConfig;
pub use validation::ValidationError;
