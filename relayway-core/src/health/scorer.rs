use crate::circuit::CircuitState;
use crate::registry::Endpoint;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Relative weight of each score component. Must form a convex combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub success_rate: f64,
    pub latency: f64,
    pub load: f64,
    pub recovery: f64,
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.success_rate + self.latency + self.load + self.recovery
    }

    pub fn is_convex(&self) -> bool {
        let parts = [self.success_rate, self.latency, self.load, self.recovery];
        parts.iter().all(|w| w.is_finite() && *w >= 0.0) && (self.sum() - 1.0).abs() <= 1e-9
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            success_rate: 0.4,
            latency: 0.3,
            load: 0.2,
            recovery: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoringParams {
    /// Average latency at which the latency factor reaches zero.
    pub latency_cap: Duration,
    /// Time after the last failure over which the recovery factor climbs back to one.
    pub recovery_window: Duration,
    /// Scores strictly above this are healthy (breaker permitting).
    pub healthy_threshold: f64,
    pub weights: ScoreWeights,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            latency_cap: Duration::from_millis(5_000),
            recovery_window: Duration::from_millis(300_000),
            healthy_threshold: 0.5,
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub success_rate: f64,
    pub latency_factor: f64,
    pub load_factor: f64,
    pub recovery_factor: f64,
    pub score: f64,
}

/// Pure mapping from endpoint counters to a `[0, 1]` health score.
#[derive(Debug, Clone, Default)]
pub struct HealthScorer {
    params: ScoringParams,
}

impl HealthScorer {
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    pub fn breakdown(&self, endpoint: &Endpoint, now: Instant) -> ScoreBreakdown {
        let p = &self.params;

        let attempts = endpoint.success_count + endpoint.failure_count;
        let success_rate = endpoint.success_count as f64 / attempts.max(1) as f64;

        let cap_ms = duration_ms(p.latency_cap).max(f64::MIN_POSITIVE);
        let latency_factor = (1.0 - endpoint.average_response_time_ms / cap_ms).max(0.0);

        let ceiling = endpoint.rate_ceiling.max(1) as f64;
        let load_factor = (1.0 - endpoint.current_window_count as f64 / ceiling).max(0.0);

        let recovery_factor = match endpoint.last_failure_at {
            None => 1.0,
            Some(at) => {
                let since = duration_ms(now.saturating_duration_since(at));
                let window = duration_ms(p.recovery_window);
                if window <= 0.0 {
                    1.0
                } else {
                    (since / window).min(1.0)
                }
            }
        };

        let w = &p.weights;
        let score = (w.success_rate * success_rate
            + w.latency * latency_factor
            + w.load * load_factor
            + w.recovery * recovery_factor)
            .clamp(0.0, 1.0);

        ScoreBreakdown {
            success_rate,
            latency_factor,
            load_factor,
            recovery_factor,
            score,
        }
    }

    pub fn score(&self, endpoint: &Endpoint, now: Instant) -> f64 {
        self.breakdown(endpoint, now).score
    }

    pub fn is_healthy(&self, score: f64, breaker: CircuitState) -> bool {
        score > self.params.healthy_threshold && breaker != CircuitState::Open
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
