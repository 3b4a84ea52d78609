//! Service health aggregation library.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod query;
pub mod registry;

pub use config::schema::ServiceConfig;
pub use health::StatusStore;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use query::QueryFacade;
pub use registry::TargetRegistry;
