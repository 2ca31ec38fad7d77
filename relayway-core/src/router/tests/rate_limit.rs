use super::*;
use crate::circuit::CircuitState;
use futures::future::join_all;
use pretty_assertions::assert_eq;

#[tokio::test(start_paused = true)]
async fn rate_ceiling_holds_under_concurrent_submits() {
    // Arrange
    let log = CallLog::default();
    let router = router(vec![spec("a", 5), spec("b", 10)]);

    // Act
    let results = join_all((0..1000).map(|_| router.submit(scripted(&log, always_ok), 0))).await;

    // Assert
    let served = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(served, 15);
    assert_eq!(log.count("a"), 5);
    assert_eq!(log.count("b"), 10);

    let status = router.status();
    assert_eq!(status.endpoint("a").unwrap().current_window_count, 5);
    assert_eq!(status.endpoint("b").unwrap().current_window_count, 10);
    assert_eq!(status.queue_length, 0);
}

#[tokio::test(start_paused = true)]
async fn window_count_resets_after_window_elapses() {
    // Arrange
    let log = CallLog::default();
    let router = router(vec![spec("a", 2)]);
    for _ in 0..3 {
        let _ = router.submit(scripted(&log, always_ok), 0).await;
    }
    assert_eq!(log.count("a"), 2);

    // Act
    tokio::time::sleep(Duration::from_secs(60)).await;
    let result = router.submit(scripted(&log, always_ok), 0).await;

    // Assert
    assert_eq!(result.as_deref(), Ok("a"));
    assert_eq!(router.status().endpoint("a").unwrap().current_window_count, 1);
}

#[tokio::test(start_paused = true)]
async fn throttling_response_opens_breaker_and_excludes_endpoint() {
    // Arrange
    let log = CallLog::default();
    let router = router(vec![spec("a", 100), spec("b", 100)]);
    let throttle_a = |id: &str| {
        if id == "a" {
            Err(UpstreamError::RateLimited { retry_after: None })
        } else {
            Ok(())
        }
    };

    // Act
    let first = router.submit(scripted(&log, throttle_a), 0).await;
    let second = router.submit(scripted(&log, throttle_a), 0).await;

    // Assert
    assert_eq!(first.as_deref(), Ok("b"));
    assert_eq!(second.as_deref(), Ok("b"));
    assert_eq!(log.count("a"), 1);

    let a = router.status().endpoint("a").cloned().unwrap();
    assert_eq!(a.breaker_state, CircuitState::Open);
    assert!(a.throttled);
}

#[tokio::test(start_paused = true)]
async fn two_concurrent_requests_spread_across_ceilings() {
    // Arrange
    let log = CallLog::default();
    let router = router(vec![spec("a", 1), spec("b", 100)]);

    // Act
    let (first, second) = tokio::join!(
        router.submit(scripted(&log, always_ok), 0),
        router.submit(scripted(&log, always_ok), 0),
    );

    // Assert
    assert!(first.is_ok() && second.is_ok());
    let status = router.status();
    assert_eq!(status.endpoint("a").unwrap().current_window_count, 1);
    assert_eq!(status.endpoint("b").unwrap().current_window_count, 1);
    assert_eq!(status.total_endpoints, 2);
    assert_eq!(status.overall_success_rate_percent, 100.0);
}
