use crate::circuit::CircuitBreakerParams;
use crate::conf::types::{
    CandidateConfig, CircuitBreakerConfig, DiscoveryConfig, EndpointConfig, RelaywayConfig,
    RouterConfig, ScoringConfig,
};
use crate::discovery::{DiscoveryCandidate, DiscoverySettings};
use crate::health::{HealthScorer, ScoreJitter, ScoreWeights, ScoringParams};
use crate::registry::{EndpointRegistry, EndpointSpec, Registration, RegistrySettings};
use crate::router::{Router, RouterSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

impl From<&RouterConfig> for RouterSettings {
    fn from(cfg: &RouterConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts as usize,
            min_request_interval: Duration::from_millis(cfg.min_request_interval_ms),
            attempt_timeout: Duration::from_millis(cfg.attempt_timeout_ms),
        }
    }
}

impl From<&RouterConfig> for RegistrySettings {
    fn from(cfg: &RouterConfig) -> Self {
        Self {
            capacity: cfg.registry_capacity as usize,
            rate_window: Duration::from_millis(cfg.rate_window_ms),
        }
    }
}

impl From<&ScoringConfig> for ScoringParams {
    fn from(cfg: &ScoringConfig) -> Self {
        Self {
            latency_cap: Duration::from_millis(cfg.latency_cap_ms),
            recovery_window: Duration::from_millis(cfg.recovery_window_ms),
            healthy_threshold: cfg.healthy_threshold,
            weights: ScoreWeights {
                success_rate: cfg.weights.success_rate,
                latency: cfg.weights.latency,
                load: cfg.weights.load,
                recovery: cfg.weights.recovery,
            },
        }
    }
}

impl From<&CircuitBreakerConfig> for CircuitBreakerParams {
    fn from(cfg: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: cfg.failure_threshold,
            cooldown: Duration::from_millis(cfg.cooldown_ms),
            max_cooldown: Duration::from_millis(cfg.max_cooldown_ms),
            half_open_max_requests: cfg.half_open_max_requests,
        }
    }
}

impl From<&DiscoveryConfig> for DiscoverySettings {
    fn from(cfg: &DiscoveryConfig) -> Self {
        Self {
            batch_size: cfg.batch_size as usize,
            probe_timeout: Duration::from_millis(cfg.probe_timeout_ms),
            probe_path: cfg.probe_path.clone(),
        }
    }
}

impl From<&EndpointConfig> for EndpointSpec {
    fn from(cfg: &EndpointConfig) -> Self {
        EndpointSpec::new(cfg.id.clone(), cfg.url.clone(), cfg.rate_ceiling)
            .with_priority(cfg.priority)
    }
}

impl From<&CandidateConfig> for DiscoveryCandidate {
    fn from(cfg: &CandidateConfig) -> Self {
        DiscoveryCandidate {
            id: cfg.id.clone(),
            url: cfg.url.clone(),
            priority: cfg.priority,
            rate_ceiling: cfg.rate_ceiling,
        }
    }
}

impl ScoringConfig {
    pub fn jitter(&self) -> Option<ScoreJitter> {
        self.jitter_seed
            .map(|seed| ScoreJitter::new(seed, self.jitter_amplitude))
    }
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn to_candidates(&self) -> Vec<DiscoveryCandidate> {
        self.candidates.iter().map(DiscoveryCandidate::from).collect()
    }
}

impl RelaywayConfig {
    pub fn scorer(&self) -> HealthScorer {
        HealthScorer::new(ScoringParams::from(&self.scoring))
    }

    /// Build a router with every configured endpoint registered. Must be called
    /// from within a tokio runtime.
    pub fn build_router(&self) -> Router {
        let scorer = self.scorer();
        let registry = Arc::new(EndpointRegistry::new(
            RegistrySettings::from(&self.router),
            scorer.clone(),
        ));

        for endpoint in &self.endpoints {
            if registry.register(endpoint.into()) == Registration::Rejected {
                warn!(endpoint = %endpoint.id, "configured endpoint did not fit in the registry");
            }
        }

        let breaker = CircuitBreakerParams::from(&self.circuit_breaker);
        let settings = RouterSettings::from(&self.router);

        match self.scoring.jitter() {
            Some(jitter) => Router::with_jitter(registry, scorer, breaker, settings, jitter),
            None => Router::new(registry, scorer, breaker, settings),
        }
    }
}
