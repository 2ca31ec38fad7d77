use crate::circuit::{CircuitBreaker, CircuitState};
use crate::health::HealthScorer;
use crate::registry::{Endpoint, EndpointId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub id: EndpointId,
    pub url: String,
    pub priority: i32,
    pub healthy: bool,
    pub score: f64,
    pub success_count: u64,
    pub failure_count: u64,
    pub current_window_count: u32,
    pub rate_ceiling: u32,
    pub average_response_time_ms: f64,
    pub throttled: bool,
    pub breaker_state: CircuitState,
    pub consecutive_failures: u32,
    pub breaker_opened_at_rfc3339: Option<String>,
}

impl EndpointStatus {
    pub(crate) fn new(
        endpoint: &Endpoint,
        score: f64,
        breaker: Option<&CircuitBreaker>,
        scorer: &HealthScorer,
        now: Instant,
    ) -> Self {
        let breaker_state = breaker
            .map(|b| b.state_at(now))
            .unwrap_or(CircuitState::Closed);

        Self {
            id: endpoint.id.clone(),
            url: endpoint.url.clone(),
            priority: endpoint.priority,
            healthy: scorer.is_healthy(score, breaker_state),
            score,
            success_count: endpoint.success_count,
            failure_count: endpoint.failure_count,
            current_window_count: endpoint.current_window_count,
            rate_ceiling: endpoint.rate_ceiling,
            average_response_time_ms: endpoint.average_response_time_ms,
            throttled: endpoint.is_throttled(now),
            breaker_state,
            consecutive_failures: breaker.map(|b| b.consecutive_failures()).unwrap_or(0),
            breaker_opened_at_rfc3339: breaker
                .and_then(|b| b.opened_at_system())
                .filter(|_| breaker_state != CircuitState::Closed)
                .map(|at| DateTime::<Utc>::from(at).to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouterStatus {
    pub endpoints: Vec<EndpointStatus>,
    pub total_endpoints: usize,
    pub healthy_endpoints: usize,
    /// Lifetime successes over lifetime attempts across all endpoints; 0 with no traffic.
    pub overall_success_rate_percent: f64,
    pub queue_length: usize,
}

impl RouterStatus {
    pub(crate) fn new(endpoints: Vec<EndpointStatus>, queue_length: usize) -> Self {
        let successes: u64 = endpoints.iter().map(|e| e.success_count).sum();
        let attempts: u64 = endpoints
            .iter()
            .map(|e| e.success_count + e.failure_count)
            .sum();

        let overall_success_rate_percent = if attempts == 0 {
            0.0
        } else {
            successes as f64 / attempts as f64 * 100.0
        };

        Self {
            total_endpoints: endpoints.len(),
            healthy_endpoints: endpoints.iter().filter(|e| e.healthy).count(),
            overall_success_rate_percent,
            queue_length,
            endpoints,
        }
    }

    pub fn endpoint(&self, id: &str) -> Option<&EndpointStatus> {
        self.endpoints.iter().find(|e| e.id.0 == id)
    }
}
