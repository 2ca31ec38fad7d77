use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub String);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        EndpointId(s.to_string())
    }
}

/// Static description of an upstream, as configured or discovered.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSpec {
    pub id: EndpointId,
    pub url: String,
    /// Tie-break when scores are equal; higher goes first.
    pub priority: i32,
    /// Max admitted attempts per rolling window.
    pub rate_ceiling: u32,
}

impl EndpointSpec {
    pub fn new(id: impl Into<String>, url: impl Into<String>, rate_ceiling: u32) -> Self {
        Self {
            id: EndpointId(id.into()),
            url: url.into(),
            priority: 0,
            rate_ceiling,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Outcome of one attempt against an endpoint.
#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    pub success: bool,
    pub latency: Duration,
}

impl Outcome {
    pub fn success(latency: Duration) -> Self {
        Self {
            success: true,
            latency,
        }
    }

    pub fn failure(latency: Duration) -> Self {
        Self {
            success: false,
            latency,
        }
    }
}

/// Runtime view of one upstream: its spec plus the counters the router feeds back.
///
/// `healthy` is intentionally not a field; it is always derived from the score
/// and the breaker state at read time.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub id: EndpointId,
    pub url: String,
    pub priority: i32,
    pub rate_ceiling: u32,

    // rolling window
    pub current_window_count: u32,
    pub window_started_at: Instant,
    pub throttled_until: Option<Instant>,

    // lifetime counters
    pub success_count: u64,
    pub failure_count: u64,
    pub average_response_time_ms: f64,
    pub last_failure_at: Option<Instant>,
    pub last_attempt_at: Option<Instant>,

    pub(crate) registered_seq: u64,
}

impl Endpoint {
    pub fn new(spec: EndpointSpec, now: Instant) -> Self {
        Self {
            id: spec.id,
            url: spec.url,
            priority: spec.priority,
            rate_ceiling: spec.rate_ceiling,
            current_window_count: 0,
            window_started_at: now,
            throttled_until: None,
            success_count: 0,
            failure_count: 0,
            average_response_time_ms: 0.0,
            last_failure_at: None,
            last_attempt_at: None,
            registered_seq: 0,
        }
    }

    pub fn spec(&self) -> EndpointSpec {
        EndpointSpec {
            id: self.id.clone(),
            url: self.url.clone(),
            priority: self.priority,
            rate_ceiling: self.rate_ceiling,
        }
    }

    /// Reset the window counter if one or more full windows have elapsed.
    ///
    /// The window start advances along interval boundaries, so the counter is reset
    /// exactly once per window no matter how often this is called.
    pub(crate) fn roll_window(&mut self, now: Instant, window: Duration) -> bool {
        let elapsed = now.saturating_duration_since(self.window_started_at);
        let window_nanos = window.as_nanos().max(1);

        if elapsed.as_nanos() < window_nanos {
            return false;
        }

        let into_current = (elapsed.as_nanos() % window_nanos) as u64;
        self.window_started_at = now - Duration::from_nanos(into_current);
        self.current_window_count = 0;

        if self.throttled_until.is_some_and(|until| now >= until) {
            self.throttled_until = None;
        }

        true
    }

    pub fn is_window_exhausted(&self) -> bool {
        self.current_window_count >= self.rate_ceiling
    }

    pub fn is_throttled(&self, now: Instant) -> bool {
        self.throttled_until.is_some_and(|until| now < until)
    }

    /// Whether the rate budget lets this endpoint take another attempt right now.
    pub fn has_capacity(&self, now: Instant) -> bool {
        !self.is_window_exhausted() && !self.is_throttled(now)
    }

    pub(crate) fn record(&mut self, outcome: Outcome, now: Instant) {
        if outcome.success {
            self.success_count = self.success_count.saturating_add(1);
        } else {
            self.failure_count = self.failure_count.saturating_add(1);
            self.last_failure_at = Some(now);
        }

        let latency_ms = outcome.latency.as_nanos() as f64 / 1_000_000.0;
        self.average_response_time_ms = if self.average_response_time_ms == 0.0 {
            latency_ms
        } else {
            (self.average_response_time_ms + latency_ms) / 2.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn endpoint(now: Instant) -> Endpoint {
        Endpoint::new(EndpointSpec::new("a", "http://127.0.0.1:1", 2), now)
    }

    #[test]
    fn ema_seeds_from_first_sample_then_halves() {
        let now = Instant::now();
        let mut ep = endpoint(now);

        ep.record(Outcome::success(Duration::from_millis(100)), now);
        assert_eq!(ep.average_response_time_ms, 100.0);

        ep.record(Outcome::success(Duration::from_millis(300)), now);
        assert_eq!(ep.average_response_time_ms, 200.0);

        ep.record(Outcome::failure(Duration::from_millis(0)), now);
        assert_eq!(ep.average_response_time_ms, 100.0);
        assert_eq!(ep.success_count, 2);
        assert_eq!(ep.failure_count, 1);
        assert_eq!(ep.last_failure_at, Some(now));
    }

    #[test]
    fn window_rolls_once_per_interval() {
        let start = Instant::now();
        let window = Duration::from_secs(60);
        let mut ep = endpoint(start);
        ep.current_window_count = 2;

        assert!(!ep.roll_window(start + Duration::from_secs(59), window));
        assert_eq!(ep.current_window_count, 2);

        assert!(ep.roll_window(start + Duration::from_secs(61), window));
        assert_eq!(ep.current_window_count, 0);
        assert_eq!(ep.window_started_at, start + Duration::from_secs(60));

        // Same window, no second reset.
        ep.current_window_count = 1;
        assert!(!ep.roll_window(start + Duration::from_secs(119), window));
        assert_eq!(ep.current_window_count, 1);
    }

    #[test]
    fn throttle_clears_when_window_rolls_past_it() {
        let start = Instant::now();
        let window = Duration::from_secs(10);
        let mut ep = endpoint(start);
        ep.throttled_until = Some(start + window);

        assert!(ep.is_throttled(start + Duration::from_secs(5)));
        assert!(!ep.has_capacity(start + Duration::from_secs(5)));

        ep.roll_window(start + Duration::from_secs(10), window);
        assert!(ep.throttled_until.is_none());
        assert!(ep.has_capacity(start + Duration::from_secs(10)));
    }
}
