use crate::circuit::CircuitBreakerParams;
use crate::discovery::*;
use crate::health::HealthScorer;
use crate::registry::{EndpointId, EndpointRegistry, Registration, RegistrySettings};
use crate::router::{Router, RouterSettings};
use crate::upstream::UpstreamError;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ---------------------------
// Helpers
// ---------------------------

/// Answers from a fixed table; unknown URLs refuse the connection.
#[derive(Default)]
struct ScriptedProber {
    answers: HashMap<String, (u16, Duration)>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    probes: AtomicUsize,
}

impl ScriptedProber {
    fn answering(pairs: &[(&str, u16, u64)]) -> Self {
        Self {
            answers: pairs
                .iter()
                .map(|(url, status, ms)| (url.to_string(), (*status, Duration::from_millis(*ms))))
                .collect(),
            delay: Duration::from_millis(10),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, base_url: &str) -> Result<ProbeReport, ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let Some((status, latency)) = self.answers.get(base_url).copied() else {
            return Err(UpstreamError::transport(
                crate::upstream::TransportFailure::Connect,
                "connection refused",
            )
            .into());
        };

        if !(200..300).contains(&status) {
            return Err(UpstreamError::HttpStatus(status).into());
        }

        Ok(ProbeReport {
            status,
            latency,
            features: ProbeFeatures {
                json_body: true,
                server: Some("scripted".to_string()),
            },
        })
    }
}

fn router(capacity: usize) -> Router {
    let registry = Arc::new(EndpointRegistry::new(
        RegistrySettings {
            capacity,
            rate_window: Duration::from_secs(60),
        },
        HealthScorer::default(),
    ));
    Router::new(
        registry,
        HealthScorer::default(),
        CircuitBreakerParams::default(),
        RouterSettings::default(),
    )
}

fn agent(router: &Router, prober: Arc<ScriptedProber>, batch_size: usize) -> DiscoveryAgent {
    DiscoveryAgent::new(
        router.clone(),
        prober,
        DiscoverySettings {
            batch_size,
            probe_timeout: Duration::from_secs(1),
            probe_path: "/".to_string(),
        },
    )
}

fn candidates(urls: &[&str]) -> Vec<DiscoveryCandidate> {
    urls.iter().map(|u| DiscoveryCandidate::new(*u, 30)).collect()
}

// ---------------------------
// Tests
// ---------------------------

#[tokio::test(start_paused = true)]
async fn responsive_candidates_are_registered_and_failures_omitted() {
    // Arrange
    let router = router(64);
    let prober = Arc::new(ScriptedProber::answering(&[
        ("http://a:1", 200, 40),
        ("http://b:2", 503, 10),
        ("http://c:3", 204, 4000),
    ]));
    let agent = agent(&router, prober, 10);

    // Act
    let report = agent
        .run_once(&candidates(&["http://a:1", "http://b:2", "http://c:3", "http://dead:4"]))
        .await;

    // Assert
    let ids: Vec<String> = report.discovered.iter().map(|d| d.id.to_string()).collect();
    assert_eq!(ids, vec!["a:1", "c:3"]);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.registered_count(), 2);
    assert_eq!(router.registry().len(), 2);
    assert!(!router.registry().contains(&EndpointId::from("b:2")));

    let a = router.registry().get(&EndpointId::from("a:1")).unwrap();
    assert_eq!(a.success_count, 1);
    assert_eq!(a.average_response_time_ms, 40.0);
}

#[tokio::test(start_paused = true)]
async fn initial_score_prefers_faster_probes() {
    // Arrange
    let router = router(64);
    let prober = Arc::new(ScriptedProber::answering(&[
        ("http://fast:1", 200, 50),
        ("http://slow:1", 200, 2500),
    ]));
    let agent = agent(&router, prober, 10);

    // Act
    let report = agent
        .run_once(&candidates(&["http://fast:1", "http://slow:1"]))
        .await;

    // Assert
    let fast = &report.discovered[0];
    let slow = &report.discovered[1];
    assert!(fast.initial_score > slow.initial_score);
    // success 1.0, load 1.0, recovery 1.0, latency 1 - 2500/5000
    assert!((slow.initial_score - 0.85).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn probes_run_in_bounded_batches() {
    // Arrange
    let router = router(64);
    let urls: Vec<String> = (0..7).map(|i| format!("http://n{i}:80")).collect();
    let table: Vec<(&str, u16, u64)> = urls.iter().map(|u| (u.as_str(), 200, 5)).collect();
    let prober = Arc::new(ScriptedProber::answering(&table));
    let agent = agent(&router, prober.clone(), 3);
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();

    // Act
    let report = agent.run_once(&candidates(&url_refs)).await;

    // Assert
    assert_eq!(report.discovered.len(), 7);
    assert_eq!(prober.probes.load(Ordering::SeqCst), 7);
    assert_eq!(prober.peak.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn slow_probe_is_cut_off_by_timeout() {
    // Arrange
    let router = router(64);
    let prober = Arc::new(ScriptedProber {
        delay: Duration::from_secs(30),
        ..ScriptedProber::answering(&[("http://a:1", 200, 5)])
    });
    let agent = agent(&router, prober, 10);

    // Act
    let report = agent.run_once(&candidates(&["http://a:1"])).await;

    // Assert
    assert!(report.discovered.is_empty());
    assert!(report.failed[0].error.contains("timed out"), "{}", report.failed[0].error);
    assert!(router.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn known_and_invalid_candidates_are_not_probed() {
    // Arrange
    let router = router(64);
    router.register(crate::registry::EndpointSpec::new("a:1", "http://a:1", 10));
    let prober = Arc::new(ScriptedProber::answering(&[("http://a:1", 200, 5)]));
    let agent = agent(&router, prober.clone(), 10);

    // Act
    let report = agent
        .run_once(&candidates(&["http://a:1", "ftp://files:21"]))
        .await;

    // Assert
    assert_eq!(report.skipped, vec![EndpointId::from("a:1")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(prober.probes.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn full_registry_reports_rejection() {
    // Arrange
    let router = router(1);
    let prober = Arc::new(ScriptedProber::answering(&[
        ("http://a:1", 200, 100),
        ("http://b:1", 200, 4900),
    ]));
    let agent = agent(&router, prober, 1);

    // Act
    let report = agent
        .run_once(&candidates(&["http://a:1", "http://b:1"]))
        .await;

    // Assert
    assert_eq!(report.discovered[0].registration, Registration::Added);
    assert_eq!(report.discovered[1].registration, Registration::Rejected);
    assert_eq!(report.registered_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn periodic_discovery_stops_with_router() {
    // Arrange
    let router = router(64);
    let prober = Arc::new(ScriptedProber::answering(&[("http://a:1", 200, 5)]));
    let handle = agent(&router, prober.clone(), 10)
        .spawn(candidates(&["http://a:1", "http://b:1"]), Duration::from_secs(60));

    // Act
    tokio::time::sleep(Duration::from_secs(150)).await;
    router.shutdown();
    handle.await.unwrap();

    // Assert
    assert!(router.registry().contains(&EndpointId::from("a:1")));
    // three passes (t=0, 60, 120); "a" is skipped once registered, "b" is retried
    assert_eq!(prober.probes.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn deferred_periodic_discovery_waits_one_interval() {
    // Arrange
    let router = router(64);
    let prober = Arc::new(ScriptedProber::answering(&[]));
    let agent = agent(&router, prober.clone(), 10);
    let list = candidates(&["http://down:1"]);
    agent.run_once(&list).await;

    // Act
    let handle = agent.spawn_after(list, Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(59)).await;
    let before_interval = prober.probes.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;
    let after_interval = prober.probes.load(Ordering::SeqCst);
    router.shutdown();
    handle.await.unwrap();

    // Assert
    assert_eq!(before_interval, 1);
    assert_eq!(after_interval, 2);
}
