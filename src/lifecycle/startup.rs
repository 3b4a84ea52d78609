//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the registry and store from validated configuration
//! - Start background polling before the listener serves traffic
//! - Tear everything down in order on shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Shutdown has a deadline: polling tasks still alive after the grace
//!   period are aborted

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::{ConfigError, ServiceConfig};
use crate::health::{HttpProber, PollScheduler, Prober, SchedulerHandle, StatusStore};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::query::QueryFacade;
use crate::registry::TargetRegistry;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build probe client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP server task failed: {0}")]
    Server(#[from] tokio::task::JoinError),
}

/// A started service: polling loops plus the HTTP server.
pub struct RunningService {
    local_addr: SocketAddr,
    store: Arc<StatusStore>,
    shutdown: Shutdown,
    scheduler: SchedulerHandle,
    server: JoinHandle<Result<(), std::io::Error>>,
    grace: Duration,
}

/// Start with the real HTTP prober.
pub async fn start(
    config: ServiceConfig,
    listener: TcpListener,
) -> Result<RunningService, StartupError> {
    let prober = HttpProber::new()?;
    start_with_prober(config, listener, prober).await
}

/// Start with any prober implementation.
pub async fn start_with_prober<P: Prober>(
    config: ServiceConfig,
    listener: TcpListener,
    prober: P,
) -> Result<RunningService, StartupError> {
    let registry = TargetRegistry::load(&config)?;
    let store = Arc::new(StatusStore::new(&registry));
    let shutdown = Shutdown::new();

    let scheduler = PollScheduler::new(store.clone(), Arc::new(prober)).spawn(&registry, &shutdown);

    let facade = QueryFacade::new(store.clone(), config.service_name.clone());
    let local_addr = listener.local_addr()?;
    let server = HttpServer::new(&config.listener, facade);
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tracing::info!(
        address = %local_addr,
        targets = registry.len(),
        polled = scheduler.running(),
        "Status service started"
    );

    Ok(RunningService {
        local_addr,
        store,
        shutdown,
        scheduler,
        server,
        grace: Duration::from_millis(config.shutdown.grace_period_ms),
    })
}

impl RunningService {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Serve until `signal` resolves or the server exits on its own.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()>,
    {
        let server_exit = tokio::select! {
            _ = signal => None,
            result = &mut self.server => Some(result),
        };

        let Some(result) = server_exit else {
            return self.shutdown().await;
        };

        tracing::error!("HTTP server exited unexpectedly");
        self.shutdown.trigger();
        self.scheduler.join(self.grace).await;
        result??;
        Ok(())
    }

    /// Stop polling and drain the server, all within one grace period.
    pub async fn shutdown(self) -> Result<(), StartupError> {
        tracing::info!("Shutdown initiated");
        self.shutdown.trigger();
        let deadline = Instant::now() + self.grace;

        let aborted = self.scheduler.join(self.grace).await;
        let server_result = drain_server(self.server, deadline).await;

        tracing::info!(aborted_pollers = aborted, "Shutdown complete");
        server_result
    }
}

/// Wait for the server task until `deadline`, then abort it.
async fn drain_server(
    mut server: JoinHandle<Result<(), std::io::Error>>,
    deadline: Instant,
) -> Result<(), StartupError> {
    match time::timeout_at(deadline, &mut server).await {
        Ok(joined) => Ok(joined??),
        Err(_) => {
            tracing::warn!("HTTP server did not drain within grace period, aborting");
            server.abort();
            Ok(())
        }
    }
}
