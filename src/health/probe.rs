//! Single liveness checks.
//!
//! # Responsibilities
//! - Issue one request to a target's health URL
//! - Classify the result as up, down (with a reason) or not applicable
//!
//! # Design Decisions
//! - Never returns an error: every failure mode becomes `ProbeResult::Down`
//! - Internal targets short-circuit without touching the network
//! - `Prober` is a trait so the scheduler can be driven by scripted outcomes

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::registry::{Reachability, TargetSpec};

/// Why a probe counted as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownReason {
    Timeout,
    ConnectionRefused,
    /// Response arrived but was not 2xx.
    BadStatus(u16),
    NetworkError(String),
}

impl DownReason {
    pub fn kind(&self) -> &'static str {
        match self {
            DownReason::Timeout => "timeout",
            DownReason::ConnectionRefused => "connection-refused",
            DownReason::BadStatus(_) => "bad-status",
            DownReason::NetworkError(_) => "network-error",
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            DownReason::BadStatus(code) => Some(code.to_string()),
            DownReason::NetworkError(msg) => Some(msg.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for DownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{} ({})", self.kind(), detail),
            None => f.write_str(self.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Up,
    Down { reason: DownReason },
    /// The target is internal and was not probed.
    NotApplicable,
}

impl ProbeResult {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeResult::Up => "up",
            ProbeResult::Down { .. } => "down",
            ProbeResult::NotApplicable => "not-applicable",
        }
    }
}

/// The outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub target: String,
    pub observed_at: DateTime<Utc>,
    pub result: ProbeResult,
    pub latency_ms: u64,
}

impl ProbeOutcome {
    pub fn up(target: impl Into<String>, latency: Duration) -> Self {
        Self::new(target, ProbeResult::Up, latency)
    }

    pub fn down(target: impl Into<String>, reason: DownReason, latency: Duration) -> Self {
        Self::new(target, ProbeResult::Down { reason }, latency)
    }

    pub fn not_applicable(target: impl Into<String>) -> Self {
        Self::new(target, ProbeResult::NotApplicable, Duration::ZERO)
    }

    fn new(target: impl Into<String>, result: ProbeResult, latency: Duration) -> Self {
        Self {
            target: target.into(),
            observed_at: Utc::now(),
            result,
            latency_ms: latency.as_millis() as u64,
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self.result, ProbeResult::Up)
    }
}

/// Performs one liveness check against a target.
pub trait Prober: Send + Sync + 'static {
    fn probe(
        &self,
        spec: &TargetSpec,
        timeout: Duration,
    ) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Prober issuing `GET <base_url><health_path>`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("status-service/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

impl Prober for HttpProber {
    async fn probe(&self, spec: &TargetSpec, timeout: Duration) -> ProbeOutcome {
        let endpoint = match &spec.reachability {
            Reachability::Internal => return ProbeOutcome::not_applicable(&spec.name),
            Reachability::Http(endpoint) => endpoint,
        };

        let start = Instant::now();
        let request = self
            .client
            .get(endpoint.health_url().clone())
            .timeout(timeout)
            .send();

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    ProbeOutcome::up(&spec.name, start.elapsed())
                } else {
                    let reason = DownReason::BadStatus(status.as_u16());
                    ProbeOutcome::down(&spec.name, reason, start.elapsed())
                }
            }
            Ok(Err(e)) => ProbeOutcome::down(&spec.name, classify_error(&e), start.elapsed()),
            Err(_) => ProbeOutcome::down(&spec.name, DownReason::Timeout, start.elapsed()),
        }
    }
}

fn classify_error(err: &reqwest::Error) -> DownReason {
    if err.is_timeout() {
        DownReason::Timeout
    } else if err.is_connect() && is_connection_refused(err) {
        DownReason::ConnectionRefused
    } else {
        DownReason::NetworkError(error_chain(err))
    }
}

fn is_connection_refused(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// reqwest's top-level message hides the cause; include the innermost one.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    let mut last = None;
    while let Some(e) = source {
        last = Some(e);
        source = e.source();
    }
    if let Some(root) = last {
        message.push_str(": ");
        message.push_str(&root.to_string());
    }
    message
}
