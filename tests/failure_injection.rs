//! Failure injection tests: real probes against misbehaving backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use status_service::config::TargetConfig;
use status_service::health::{DownReason, HttpProber, ProbeResult, Prober};
use status_service::lifecycle;
use status_service::TargetRegistry;

mod common;

#[tokio::test]
async fn test_probe_classifies_responses() {
    let ok = common::start_programmable_backend(|| async { (200, "ok".into()) }).await;
    let failing = common::start_programmable_backend(|| async { (503, "down".into()) }).await;

    let config = common::config_with(vec![
        common::fast_target("ok", ok, 1),
        common::fast_target("failing", failing, 1),
    ]);
    let registry = TargetRegistry::load(&config).unwrap();
    let prober = HttpProber::new().unwrap();

    let spec = registry.get("ok").unwrap();
    let outcome = prober.probe(spec, spec.timeout).await;
    assert_eq!(outcome.result, ProbeResult::Up);

    let spec = registry.get("failing").unwrap();
    let outcome = prober.probe(spec, spec.timeout).await;
    assert_eq!(
        outcome.result,
        ProbeResult::Down { reason: DownReason::BadStatus(503) }
    );
}

#[tokio::test]
async fn test_degrade_and_recover_end_to_end() {
    let healthy = Arc::new(AtomicBool::new(true));
    let flag = healthy.clone();
    let backend = common::start_programmable_backend(move || {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                (200, "ok".into())
            } else {
                (500, "dead".into())
            }
        }
    })
    .await;

    let config = common::config_with(vec![
        common::fast_target("api", backend, 2),
        TargetConfig::internal("worker"),
    ]);
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let service = lifecycle::start(config, listener).await.unwrap();
    let base = format!("http://{}", service.local_addr());
    let client = reqwest::Client::new();

    let status_of = |client: reqwest::Client, base: String| async move {
        client
            .get(format!("{}/status", base))
            .send()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap()
    };

    assert!(
        common::wait_until(Duration::from_secs(5), || {
            let (client, base) = (client.clone(), base.clone());
            async move { status_of(client, base).await["services"]["api"] == "healthy" }
        })
        .await,
        "api never became healthy"
    );

    healthy.store(false, Ordering::SeqCst);
    assert!(
        common::wait_until(Duration::from_secs(5), || {
            let (client, base) = (client.clone(), base.clone());
            async move { status_of(client, base).await["status"] == "degraded" }
        })
        .await,
        "system never became degraded"
    );

    let body = status_of(client.clone(), base.clone()).await;
    assert_eq!(body["services"]["api"], "unhealthy");
    assert_eq!(body["services"]["worker"], "unknown");

    let detail: serde_json::Value = client
        .get(format!("{}/services/api", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(detail["consecutiveFailures"].as_u64().unwrap() >= 2);
    assert_eq!(detail["lastOutcome"]["reason"], "bad-status");
    assert_eq!(detail["lastOutcome"]["detail"], "500");

    healthy.store(true, Ordering::SeqCst);
    assert!(
        common::wait_until(Duration::from_secs(5), || {
            let (client, base) = (client.clone(), base.clone());
            async move { status_of(client, base).await["status"] == "operational" }
        })
        .await,
        "system never recovered"
    );

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_hung_backend_recorded_as_timeout() {
    let hung = common::start_hanging_backend().await;
    let ok = common::start_programmable_backend(|| async { (200, "ok".into()) }).await;

    let config = common::config_with(vec![
        common::fast_target("hung", hung, 1),
        common::fast_target("ok", ok, 1),
    ]);
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let service = lifecycle::start(config, listener).await.unwrap();
    let store = service.store().clone();

    assert!(
        common::wait_until(Duration::from_secs(5), || {
            let store = store.clone();
            async move {
                let hung = store.get("hung").unwrap();
                hung.last_outcome.as_ref().map(|o| o.result.clone())
                    == Some(ProbeResult::Down { reason: DownReason::Timeout })
            }
        })
        .await,
        "hung target never timed out"
    );

    let snapshot = store.snapshot();
    assert_eq!(snapshot.get("hung").unwrap().health.status.as_str(), "unhealthy");
    assert_eq!(snapshot.get("ok").unwrap().health.status.as_str(), "healthy");

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_refused_connection_counts_like_timeout() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let config = common::config_with(vec![common::fast_target("gone", closed, 3)]);
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let service = lifecycle::start(config, listener).await.unwrap();
    let store = service.store().clone();

    assert!(
        common::wait_until(Duration::from_secs(5), || {
            let store = store.clone();
            async move { store.get("gone").unwrap().consecutive_failures >= 3 }
        })
        .await
    );

    let gone = store.get("gone").unwrap();
    assert_eq!(gone.status.as_str(), "unhealthy");
    assert_eq!(
        gone.last_outcome.as_ref().unwrap().result,
        ProbeResult::Down { reason: DownReason::ConnectionRefused }
    );

    service.shutdown().await.unwrap();
}
