use crate::circuit::CircuitBreakerParams;
use crate::conf::types::RouterConfig;
use crate::conf::{ConfigError, RelaywayConfig, load_config, parse_config};
use crate::router::RouterSettings;
use pretty_assertions::assert_eq;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn parse_full_config_file() {
    // Arrange
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("relayway.hcl"),
        r#"
router = {
  max_attempts            = 5
  min_request_interval_ms = 250
}

scoring = {
  jitter_seed = 7
  weights = {
    success_rate = 0.5
    latency      = 0.2
    load         = 0.2
    recovery     = 0.1
  }
}

circuit_breaker = {
  failure_threshold = 2
  cooldown_ms       = 1000
  max_cooldown_ms   = 8000
}

endpoints = [
  { id = "a", url = "http://127.0.0.1:9001", priority = 5, rate_ceiling = 10 },
  { id = "b", url = "https://rpc.example.org" },
]

discovery = {
  enable     = true
  batch_size = 4
  candidates = [
    { url = "http://127.0.0.1:9100" },
  ]
}
"#,
    )
    .unwrap();

    // Act
    let cfg = load_config(dir.path()).unwrap();

    // Assert
    let c = &cfg.config;
    assert!(cfg.warnings.is_empty());
    assert_eq!(c.router.max_attempts, 5);
    assert_eq!(c.router.attempt_timeout_ms, 10_000);
    assert_eq!(c.scoring.jitter_seed, Some(7));
    assert_eq!(c.scoring.weights.success_rate, 0.5);
    assert_eq!(c.circuit_breaker.half_open_max_requests, 1);
    assert_eq!(c.endpoints.len(), 2);
    assert_eq!(c.endpoints[0].priority, 5);
    assert_eq!(c.endpoints[1].rate_ceiling, 60);
    assert!(c.discovery.enable);
    assert_eq!(c.discovery.to_candidates()[0].rate_ceiling, 60);
}

#[test]
fn empty_file_yields_defaults() {
    // Arrange
    let dir = tempdir().unwrap();
    let path = dir.path().join("relayway.hcl");
    fs::write(&path, "").unwrap();

    // Act
    let cfg = parse_config(&path).unwrap();

    // Assert
    assert_eq!(cfg, RelaywayConfig::default());
}

#[test]
fn defaults_lower_to_runtime_defaults() {
    // Arrange
    let cfg = RelaywayConfig::default();

    // Act
    let settings = RouterSettings::from(&cfg.router);
    let breaker = CircuitBreakerParams::from(&cfg.circuit_breaker);

    // Assert
    assert_eq!(settings.max_attempts, 3);
    assert_eq!(settings.min_request_interval, Duration::from_millis(500));
    assert_eq!(settings.attempt_timeout, Duration::from_secs(10));
    assert_eq!(breaker.cooldown, Duration::from_secs(30));
    assert_eq!(breaker.max_cooldown, Duration::from_secs(300));
    assert!(cfg.scoring.jitter().is_none());
    assert_eq!(RouterConfig::default().registry_capacity, 64);
}

#[test]
fn missing_file_is_a_read_error() {
    // Arrange
    let dir = tempdir().unwrap();

    // Act
    let err = load_config(dir.path()).unwrap_err();

    // Assert
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn unknown_field_is_a_parse_error() {
    // Arrange
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("relayway.hcl"),
        r#"
router = {
  max_attempt = 3
}
"#,
    )
    .unwrap();

    // Act
    let err = load_config(dir.path()).unwrap_err();

    // Assert
    assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
}

#[tokio::test]
async fn build_router_registers_configured_endpoints() {
    // Arrange
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("relayway.hcl"),
        r#"
endpoints = [
  { id = "a", url = "http://127.0.0.1:9001" },
  { id = "b", url = "http://127.0.0.1:9002", priority = 3 },
]
"#,
    )
    .unwrap();
    let cfg = load_config(dir.path()).unwrap().config;

    // Act
    let router = cfg.build_router();

    // Assert
    let status = router.status();
    assert_eq!(status.total_endpoints, 2);
    assert_eq!(status.endpoint("b").unwrap().priority, 3);
    assert_eq!(router.registry().capacity(), 64);
    router.shutdown();
}
