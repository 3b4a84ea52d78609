//! Poll scheduling.
//!
//! # Responsibilities
//! - Run one polling loop per pollable target
//! - Bound every probe by the target's timeout
//! - Feed outcomes into the status store
//! - Stop all loops on shutdown
//!
//! # Design Decisions
//! - One tokio task per target: a hung target only ever stalls its own loop
//! - A loop awaits its probe before waiting for the next tick, so probes of
//!   one target never overlap and outcomes are applied in completion order
//! - A timed-out probe is dropped (cancelling the request) and recorded as
//!   `Down{timeout}`; the next attempt waits for the next tick
//! - Shutdown interrupts both the tick wait and an in-flight probe

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::health::probe::{DownReason, ProbeOutcome, ProbeResult, Prober};
use crate::health::state::HealthStatus;
use crate::health::store::StatusStore;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::registry::{TargetRegistry, TargetSpec};

/// Drives repeated probing of every pollable target.
pub struct PollScheduler<P: Prober> {
    store: Arc<StatusStore>,
    prober: Arc<P>,
}

impl<P: Prober> PollScheduler<P> {
    pub fn new(store: Arc<StatusStore>, prober: Arc<P>) -> Self {
        Self { store, prober }
    }

    /// Spawn one polling task per `Http` target.
    pub fn spawn(&self, registry: &TargetRegistry, shutdown: &Shutdown) -> SchedulerHandle {
        let mut tasks = JoinSet::new();

        // Every registered target reports a health value from the start.
        for spec in registry.iter() {
            let status = self.store.get(&spec.name).map(|h| h.status).unwrap_or_default();
            metrics::record_target_health(&spec.name, status);
        }

        for spec in registry.pollable() {
            tracing::info!(
                target_name = %spec.name,
                interval_ms = spec.poll_interval.as_millis() as u64,
                timeout_ms = spec.timeout.as_millis() as u64,
                failure_threshold = spec.failure_threshold,
                "Polling target"
            );
            tasks.spawn(poll_target(
                spec.clone(),
                self.prober.clone(),
                self.store.clone(),
                shutdown.subscribe(),
            ));
        }

        for spec in registry.iter().filter(|s| !s.is_pollable()) {
            tracing::debug!(target_name = %spec.name, "Internal target, not polled");
        }

        SchedulerHandle { tasks }
    }
}

/// Handle over the running polling tasks.
#[derive(Debug)]
pub struct SchedulerHandle {
    tasks: JoinSet<()>,
}

impl SchedulerHandle {
    /// Number of polling loops still running.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for all loops to exit, aborting whatever is left after `grace`.
    ///
    /// Returns the number of loops that had to be aborted.
    pub async fn join(mut self, grace: Duration) -> usize {
        let drained = time::timeout(grace, async {
            while let Some(result) = self.tasks.join_next().await {
                if let Err(e) = result {
                    if e.is_panic() {
                        tracing::error!(error = %e, "Polling task panicked");
                    }
                }
            }
        })
        .await;

        if drained.is_ok() {
            return 0;
        }

        let remaining = self.tasks.len();
        tracing::warn!(remaining, "Polling tasks did not stop within grace period, aborting");
        self.tasks.shutdown().await;
        remaining
    }
}

async fn poll_target<P: Prober>(
    spec: Arc<TargetSpec>,
    prober: Arc<P>,
    store: Arc<StatusStore>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval(spec.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = shutdown.recv() => {
                tracing::debug!(target_name = %spec.name, "Abandoning in-flight probe");
                break;
            }
            outcome = probe_with_deadline(prober.as_ref(), &spec) => outcome,
        };

        record(&store, &spec, &outcome);
    }

    tracing::debug!(target_name = %spec.name, "Polling loop stopped");
}

/// Run one probe, bounded by the target's timeout.
pub async fn probe_with_deadline<P: Prober>(prober: &P, spec: &TargetSpec) -> ProbeOutcome {
    match time::timeout(spec.timeout, prober.probe(spec, spec.timeout)).await {
        Ok(outcome) => outcome,
        Err(_) => ProbeOutcome::down(&spec.name, DownReason::Timeout, spec.timeout),
    }
}

fn record(store: &StatusStore, spec: &TargetSpec, outcome: &ProbeOutcome) {
    metrics::record_probe(&spec.name, outcome.result.label(), outcome.latency_ms);

    let transition = match store.update(&spec.name, outcome) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "Dropping probe outcome");
            return;
        }
    };

    if let ProbeResult::Down { reason } = &outcome.result {
        let failures = store.get(&spec.name).map(|h| h.consecutive_failures).unwrap_or(0);
        tracing::debug!(
            target_name = %spec.name,
            reason = %reason,
            failures,
            threshold = spec.failure_threshold,
            "Probe failed"
        );
    } else {
        tracing::trace!(
            target_name = %spec.name,
            latency_ms = outcome.latency_ms,
            "Probe succeeded"
        );
    }

    if let Some(t) = transition {
        metrics::record_target_health(&spec.name, t.to);
        match t.to {
            HealthStatus::Unhealthy => tracing::warn!(
                target_name = %spec.name,
                from = %t.from,
                to = %t.to,
                threshold = spec.failure_threshold,
                "Target marked unhealthy"
            ),
            _ => tracing::info!(
                target_name = %spec.name,
                from = %t.from,
                to = %t.to,
                "Target status changed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ServiceConfig, TargetConfig};
    use crate::health::store::SystemStatus;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results per call, then repeats the last one.
    struct ScriptedProber {
        script: Mutex<VecDeque<Step>>,
        last: Mutex<Step>,
        calls: AtomicUsize,
    }

    #[derive(Clone)]
    enum Step {
        Up,
        Refused,
        Hang,
    }

    impl ScriptedProber {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                script: Mutex::new(steps.into()),
                last: Mutex::new(Step::Up),
                calls: AtomicUsize::new(0),
            }
        }

        fn next_step(&self) -> Step {
            let mut last = self.last.lock().unwrap();
            if let Some(step) = self.script.lock().unwrap().pop_front() {
                *last = step;
            }
            last.clone()
        }
    }

    impl Prober for ScriptedProber {
        async fn probe(&self, spec: &TargetSpec, _timeout: Duration) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.next_step() {
                Step::Up => ProbeOutcome::up(&spec.name, Duration::from_millis(1)),
                Step::Refused => {
                    ProbeOutcome::down(&spec.name, DownReason::ConnectionRefused, Duration::ZERO)
                }
                Step::Hang => std::future::pending().await,
            }
        }
    }

    fn setup(targets: Vec<TargetConfig>) -> (TargetRegistry, Arc<StatusStore>) {
        let config = ServiceConfig {
            targets,
            ..ServiceConfig::default()
        };
        let registry = TargetRegistry::load(&config).unwrap();
        let store = Arc::new(StatusStore::new(&registry));
        (registry, store)
    }

    fn target(name: &str, interval_ms: u64, timeout_ms: u64, threshold: u32) -> TargetConfig {
        let mut t = TargetConfig::http(name, format!("http://{}:80", name));
        t.poll_interval_ms = Some(interval_ms);
        t.timeout_ms = Some(timeout_ms);
        t.failure_threshold = Some(threshold);
        t
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_debounced_then_recovery() {
        let (registry, store) =
            setup(vec![target("a", 1_000, 500, 3), TargetConfig::internal("b")]);
        let prober = Arc::new(ScriptedProber::new(vec![
            Step::Refused,
            Step::Refused,
            Step::Refused,
            Step::Up,
        ]));
        let shutdown = Shutdown::new();
        let handle = PollScheduler::new(store.clone(), prober.clone()).spawn(&registry, &shutdown);
        assert_eq!(handle.running(), 1);

        // First probe fires immediately, the next ones every second.
        time::sleep(Duration::from_millis(1_500)).await;
        let a = store.get("a").unwrap();
        assert_eq!(a.consecutive_failures, 2);
        assert_eq!(a.status, HealthStatus::Unknown);

        time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(store.get("a").unwrap().status, HealthStatus::Unhealthy);
        assert_eq!(store.snapshot().system_status(), SystemStatus::Degraded);

        time::sleep(Duration::from_millis(1_000)).await;
        let a = store.get("a").unwrap();
        assert_eq!(a.status, HealthStatus::Healthy);
        assert_eq!(a.consecutive_failures, 0);
        assert_eq!(store.get("b").unwrap().status, HealthStatus::Unknown);

        shutdown.trigger();
        assert_eq!(handle.join(Duration::from_secs(1)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let (registry, store) = setup(vec![target("slow", 1_000, 200, 2)]);
        let prober = Arc::new(ScriptedProber::new(vec![Step::Hang]));
        let shutdown = Shutdown::new();
        let handle = PollScheduler::new(store.clone(), prober.clone()).spawn(&registry, &shutdown);

        time::sleep(Duration::from_millis(300)).await;
        let slow = store.get("slow").unwrap();
        assert_eq!(slow.consecutive_failures, 1);
        let last = slow.last_outcome.as_ref().unwrap();
        assert_eq!(last.result, ProbeResult::Down { reason: DownReason::Timeout });
        assert_eq!(last.latency_ms, 200);

        // Not retried before the next tick.
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.get("slow").unwrap().status, HealthStatus::Unhealthy);

        shutdown.trigger();
        handle.join(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_target_does_not_delay_others() {
        struct SplitProber;
        impl Prober for SplitProber {
            async fn probe(&self, spec: &TargetSpec, _timeout: Duration) -> ProbeOutcome {
                if spec.name == "hung" {
                    std::future::pending().await
                } else {
                    ProbeOutcome::up(&spec.name, Duration::ZERO)
                }
            }
        }

        let (registry, store) =
            setup(vec![target("hung", 10_000, 10_000, 1), target("fast", 100, 50, 1)]);
        let shutdown = Shutdown::new();
        let handle =
            PollScheduler::new(store.clone(), Arc::new(SplitProber)).spawn(&registry, &shutdown);

        time::sleep(Duration::from_millis(1_050)).await;
        let fast = store.get("fast").unwrap();
        assert_eq!(fast.status, HealthStatus::Healthy);
        assert!(fast.last_checked_at.is_some());
        assert!(store.get("hung").unwrap().last_checked_at.is_none());

        // Shutdown cancels the in-flight probe of the hung target.
        shutdown.trigger();
        assert_eq!(handle.join(Duration::from_millis(100)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_probes_after_shutdown() {
        let (registry, store) = setup(vec![target("a", 100, 50, 1)]);
        let prober = Arc::new(ScriptedProber::new(vec![Step::Up]));
        let shutdown = Shutdown::new();
        let handle = PollScheduler::new(store, prober.clone()).spawn(&registry, &shutdown);

        time::sleep(Duration::from_millis(250)).await;
        shutdown.trigger();
        handle.join(Duration::from_secs(1)).await;
        let calls = prober.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 3);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), calls);
    }

    fn gauge_lines(rendered: &str) -> Vec<&str> {
        rendered
            .lines()
            .filter(|l| l.starts_with("status_target_health{"))
            .collect()
    }

    #[tokio::test]
    async fn test_health_gauge_seeded_for_every_target() {
        let (registry, store) =
            setup(vec![target("a", 1_000, 500, 1), TargetConfig::internal("b")]);
        let recorder = PrometheusBuilder::new().build_recorder();
        let prometheus = recorder.handle();
        let shutdown = Shutdown::new();

        let handle = ::metrics::with_local_recorder(&recorder, || {
            PollScheduler::new(store.clone(), Arc::new(ScriptedProber::new(vec![Step::Up])))
                .spawn(&registry, &shutdown)
        });

        let rendered = prometheus.render();
        let lines = gauge_lines(&rendered);
        assert_eq!(lines.len(), 2, "{}", rendered);
        assert!(lines.iter().any(|l| l.starts_with("status_target_health{target=\"a\"} -1")));
        assert!(lines.iter().any(|l| l.starts_with("status_target_health{target=\"b\"} -1")));

        shutdown.trigger();
        handle.join(Duration::from_secs(1)).await;
    }

    #[test]
    fn test_record_updates_gauge_on_transition() {
        let (registry, store) = setup(vec![target("a", 1_000, 500, 2)]);
        let spec = registry.get("a").unwrap().clone();
        let recorder = PrometheusBuilder::new().build_recorder();
        let prometheus = recorder.handle();
        let refused = || ProbeOutcome::down("a", DownReason::ConnectionRefused, Duration::ZERO);

        ::metrics::with_local_recorder(&recorder, || {
            record(&store, &spec, &ProbeOutcome::up("a", Duration::from_millis(3)));
        });
        let rendered = prometheus.render();
        let lines = gauge_lines(&rendered);
        assert_eq!(lines.len(), 1, "{}", rendered);
        assert!(lines[0].starts_with("status_target_health{target=\"a\"} 1"));
        assert!(rendered.contains("status_probes_total{target=\"a\",result=\"up\"} 1"));

        ::metrics::with_local_recorder(&recorder, || {
            record(&store, &spec, &refused());
            record(&store, &spec, &refused());
        });
        let rendered = prometheus.render();
        let lines = gauge_lines(&rendered);
        assert_eq!(lines.len(), 1, "{}", rendered);
        assert!(lines[0].starts_with("status_target_health{target=\"a\"} 0"));
        assert!(rendered.contains("status_probes_total{target=\"a\",result=\"down\"} 2"));
    }
}
