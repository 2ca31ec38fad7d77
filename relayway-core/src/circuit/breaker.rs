use crate::registry::EndpointId;
use crate::upstream::FailureClass;
use std::fmt;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CircuitBreakerParams {
    /// Consecutive ordinary failures in the closed state before opening.
    pub failure_threshold: u32,
    /// Initial open duration before probes are allowed.
    pub cooldown: Duration,
    /// Upper bound for the doubled cooldown after failed probes.
    pub max_cooldown: Duration,
    /// How many simultaneous probe requests are allowed in half-open.
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerParams {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
            max_cooldown: Duration::from_secs(300),
            half_open_max_requests: 1,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(s)
    }
}

/// What the breaker learns from a finished attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure(FailureClass),
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    // state machine data
    pub(crate) state: CircuitState,

    // Closed
    pub(crate) consecutive_failures: u32,

    // Open
    pub(crate) opened_at_instant: Option<Instant>,
    pub(crate) opened_at_system: Option<SystemTime>,
    pub(crate) current_cooldown: Duration,

    // HalfOpen
    pub(crate) half_open_in_flight: u32,
}

impl CircuitBreaker {
    pub fn new(p: &CircuitBreakerParams) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at_instant: None,
            opened_at_system: None,
            current_cooldown: p.cooldown,
            half_open_in_flight: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn current_cooldown(&self) -> Duration {
        self.current_cooldown
    }

    pub fn opened_at_system(&self) -> Option<SystemTime> {
        self.opened_at_system
    }

    /// Effective state at `now`, without mutating anything.
    ///
    /// An open circuit whose cooldown has elapsed reports half-open.
    pub fn state_at(&self, now: Instant) -> CircuitState {
        match (self.state, self.opened_at_instant) {
            (CircuitState::Open, Some(opened_at))
                if now.saturating_duration_since(opened_at) >= self.current_cooldown =>
            {
                CircuitState::HalfOpen
            }
            (state, _) => state,
        }
    }

    /// Whether `allow_request` would admit a request at `now`.
    pub fn can_admit(&self, p: &CircuitBreakerParams, now: Instant) -> bool {
        match self.state_at(now) {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                // A pending promotion starts with no probes in flight.
                self.state == CircuitState::Open
                    || self.half_open_in_flight < p.half_open_max_requests
            }
        }
    }

    /// Returns whether we should allow *starting* a request to this endpoint right now.
    pub fn allow_request(&mut self, id: &EndpointId, p: &CircuitBreakerParams, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => true,

            CircuitState::Open => {
                let Some(opened_at) = self.opened_at_instant else {
                    // Shouldn't happen, but failsafe: treat as open.
                    return false;
                };

                if now.saturating_duration_since(opened_at) < self.current_cooldown {
                    return false;
                }

                // Promote to half-open and allow probes.
                let old_state = self.state;
                self.state = CircuitState::HalfOpen;
                self.half_open_in_flight = 0;

                info!(
                    event = "circuit_transition",
                    endpoint = %id,
                    from = %old_state,
                    to = %self.state,
                    reason = "cooldown_expired"
                );

                self.allow_request(id, p, now)
            }

            CircuitState::HalfOpen => {
                if self.half_open_in_flight < p.half_open_max_requests {
                    self.half_open_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Give back a half-open probe slot that was admitted but never used.
    pub fn release(&mut self) {
        if self.state == CircuitState::HalfOpen && self.half_open_in_flight > 0 {
            self.half_open_in_flight -= 1;
        }
    }

    /// Called when the request finishes. `started` tells us whether this request was
    /// actually admitted by `allow_request()` (so we can unwind counters safely).
    pub fn on_request_end(
        &mut self,
        id: &EndpointId,
        p: &CircuitBreakerParams,
        started: bool,
        outcome: CallOutcome,
        now: Instant,
    ) {
        match self.state {
            CircuitState::Closed => match outcome {
                CallOutcome::Success => {
                    self.consecutive_failures = 0;
                }
                CallOutcome::Failure(FailureClass::Throttled) => {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                    self.trip_open(id, now, "rate_limited");
                }
                CallOutcome::Failure(FailureClass::Ordinary) => {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                    if self.consecutive_failures >= p.failure_threshold {
                        self.trip_open(id, now, "failure_threshold_exceeded");
                    }
                }
            },

            CircuitState::Open => {
                // no-op; requests are not admitted while open
                // except the time-based promotion handled in allow_request()
            }

            CircuitState::HalfOpen => {
                if started && self.half_open_in_flight > 0 {
                    self.half_open_in_flight -= 1;
                }

                match outcome {
                    CallOutcome::Success => self.reset_closed(id, p),
                    CallOutcome::Failure(_) => {
                        // Any failure while half-open re-opens with a longer cooldown.
                        self.current_cooldown = self
                            .current_cooldown
                            .saturating_mul(2)
                            .min(p.max_cooldown);
                        self.trip_open(id, now, "half_open_failure");
                    }
                }
            }
        }
    }

    pub(crate) fn trip_open(&mut self, id: &EndpointId, now: Instant, reason: &'static str) {
        let old_state = self.state;
        self.state = CircuitState::Open;
        self.opened_at_instant = Some(now);
        self.opened_at_system = Some(SystemTime::now());
        let failures = self.consecutive_failures;
        self.consecutive_failures = 0;
        self.half_open_in_flight = 0;

        info!(
            event = "circuit_transition",
            endpoint = %id,
            from = %old_state,
            to = %self.state,
            reason = reason,
            failures = failures,
            cooldown_ms = self.current_cooldown.as_millis() as u64
        );
    }

    fn reset_closed(&mut self, id: &EndpointId, p: &CircuitBreakerParams) {
        let old_state = self.state;
        self.state = CircuitState::Closed;
        self.opened_at_instant = None;
        self.opened_at_system = None;
        self.consecutive_failures = 0;
        self.half_open_in_flight = 0;
        self.current_cooldown = p.cooldown;

        info!(
            event = "circuit_transition",
            endpoint = %id,
            from = %old_state,
            to = %self.state,
            reason = "probe_succeeded"
        );
    }
}
