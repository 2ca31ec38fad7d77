use integration_tests::harness::{Reply, TestUpstream, dead_url, get_body};
use pretty_assertions::assert_eq;
use relayway_core::conf::RelaywayConfig;
use relayway_core::conf::types::{CandidateConfig, DiscoveryConfig, RouterConfig};
use relayway_core::discovery::{
    DiscoveryAgent, DiscoveryCandidate, DiscoverySettings, HttpProber, Prober,
};
use relayway_core::registry::{EndpointId, Registration};
use std::sync::Arc;
use std::time::Duration;

fn candidate(url: String) -> CandidateConfig {
    CandidateConfig {
        url,
        id: None,
        priority: 0,
        rate_ceiling: 50,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn http_prober_reports_features() {
    // Arrange
    let json = TestUpstream::start(Reply::Json(r#"{"jsonrpc":"2.0","result":"0x1"}"#));
    let prober = HttpProber::new("/health", Duration::from_secs(2)).unwrap();

    // Act
    let report = prober.probe(&json.url()).await.unwrap();

    // Assert
    assert_eq!(report.status, 200);
    assert!(report.features.json_body);
    assert_eq!(report.features.server.as_deref(), Some("relayway-test"));
    assert_eq!(json.hits(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn http_prober_rejects_non_success() {
    // Arrange
    let failing = TestUpstream::start(Reply::Status(503));
    let prober = HttpProber::new("/", Duration::from_secs(2)).unwrap();

    // Act
    let result = prober.probe(&failing.url()).await;

    // Assert
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn discovered_endpoints_are_routable() {
    // Arrange
    let live = TestUpstream::start(Reply::Json(r#"{"ok":true}"#));
    let unavailable = TestUpstream::start(Reply::Status(503));
    let cfg = RelaywayConfig {
        router: RouterConfig {
            min_request_interval_ms: 0,
            ..Default::default()
        },
        discovery: DiscoveryConfig {
            enable: true,
            batch_size: 2,
            probe_timeout_ms: 2_000,
            candidates: vec![
                candidate(live.url()),
                candidate(unavailable.url()),
                candidate(dead_url()),
            ],
            ..Default::default()
        },
        ..Default::default()
    };
    let router = cfg.build_router();
    let agent = DiscoveryAgent::new(
        router.clone(),
        Arc::new(HttpProber::new("/", Duration::from_secs(2)).unwrap()),
        DiscoverySettings::from(&cfg.discovery),
    );

    // Act
    let report = agent.run_once(&cfg.discovery.to_candidates()).await;
    let (served_by, body) = router.submit(get_body("/"), 0).await.unwrap();

    // Assert
    assert_eq!(report.discovered.len(), 1);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.discovered[0].registration, Registration::Added);
    assert!(report.discovered[0].features.json_body);
    assert!(report.discovered[0].initial_score > 0.9);

    assert_eq!(served_by, EndpointId(live.id()));
    assert_eq!(body, r#"{"ok":true}"#);
    assert_eq!(router.status().total_endpoints, 1);
    router.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_candidate_ids_are_kept() {
    // Arrange
    let live = TestUpstream::start(Reply::Text("pong"));
    let router = RelaywayConfig::default().build_router();
    let agent = DiscoveryAgent::new(
        router.clone(),
        Arc::new(HttpProber::new("/", Duration::from_secs(2)).unwrap()),
        DiscoverySettings::default(),
    );

    // Act
    let report = agent
        .run_once(&[DiscoveryCandidate::new(live.url(), 10).with_id("named")])
        .await;

    // Assert
    assert_eq!(report.registered_count(), 1);
    assert!(router.registry().contains(&EndpointId::from("named")));
    assert!(!report.discovered[0].features.json_body);
    router.shutdown();
}
