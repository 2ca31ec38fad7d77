use super::*;
use crate::router::RouterError;
use pretty_assertions::assert_eq;

#[tokio::test(start_paused = true)]
async fn exhausted_error_lists_every_attempted_endpoint() {
    // Arrange
    let log = CallLog::default();
    let router = router(vec![spec("a", 10), spec("b", 10)]);

    // Act
    let err = router
        .submit(scripted(&log, always_500), 0)
        .await
        .unwrap_err();

    // Assert
    match err {
        RouterError::Exhausted {
            attempted_endpoints,
            last_error,
        } => {
            assert_eq!(attempted_endpoints, vec!["a".to_string(), "b".to_string()]);
            assert!(last_error.contains("500"), "{last_error}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn attempts_are_capped_at_max_attempts() {
    // Arrange
    let log = CallLog::default();
    let router = router(vec![
        spec("a", 10),
        spec("b", 10),
        spec("c", 10),
        spec("d", 10),
    ]);

    // Act
    let err = router
        .submit(scripted(&log, always_500), 0)
        .await
        .unwrap_err();

    // Assert
    assert_eq!(err.attempted_endpoints().len(), 3);
    assert_eq!(log.all().len(), 3);
    assert_eq!(log.count("d"), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_registry_reports_nothing_attempted() {
    // Arrange
    let log = CallLog::default();
    let router = router(vec![]);

    // Act
    let err = router
        .submit(scripted(&log, always_ok), 0)
        .await
        .unwrap_err();

    // Assert
    let RouterError::Exhausted {
        attempted_endpoints,
        last_error,
    } = err
    else {
        panic!("expected exhaustion");
    };
    assert!(attempted_endpoints.is_empty());
    assert!(last_error.starts_with("no endpoint available"));
    assert!(log.all().is_empty());
}

#[tokio::test(start_paused = true)]
async fn each_endpoint_is_tried_at_most_once_per_request() {
    // Arrange
    let log = CallLog::default();
    let settings = RouterSettings {
        max_attempts: 5,
        ..fast_settings()
    };
    let router = router_with(
        vec![spec("a", 10), spec("b", 10)],
        settings,
        CircuitBreakerParams::default(),
    );

    // Act
    let err = router
        .submit(scripted(&log, always_500), 0)
        .await
        .unwrap_err();

    // Assert
    assert_eq!(err.attempted_endpoints().len(), 2);
    assert_eq!(log.count("a"), 1);
    assert_eq!(log.count("b"), 1);
}
