use crate::conf::ConfigError;
use crate::conf::types::{
    CircuitBreakerConfig, DiscoveryConfig, EndpointConfig, RelaywayConfig, RouterConfig,
    ScoringConfig,
};
use crate::conf::validation::constraints::*;
use crate::conf::validation::{ValidationCtx, ValidationErrors};
use crate::discovery::parse_http_url;
use crate::health::ScoreWeights;
use std::collections::HashSet;

/// Validate the whole config, aggregating every error. Returns warnings on success.
pub fn validate_config(cfg: &RelaywayConfig) -> Result<Vec<String>, ValidationErrors> {
    let mut ctx = ValidationCtx::default();

    validate_router(&cfg.router, &mut ctx);
    validate_scoring(&cfg.scoring, &mut ctx);
    validate_circuit_breaker(&cfg.circuit_breaker, &mut ctx);
    validate_endpoints(&cfg.endpoints, &cfg.router, &mut ctx);
    validate_discovery(&cfg.discovery, &mut ctx);

    if cfg.endpoints.is_empty() && !cfg.discovery.enable {
        ctx.warn("no endpoints configured and discovery is disabled; every request will fail");
    }

    ctx.into_result()
}

pub fn validate_router(router: &RouterConfig, ctx: &mut ValidationCtx) {
    validate_range(router.max_attempts, &ROUTER_MAX_ATTEMPTS, ctx);
    validate_range(
        router.min_request_interval_ms,
        &ROUTER_MIN_REQUEST_INTERVAL_MS,
        ctx,
    );
    validate_range(router.attempt_timeout_ms, &ROUTER_ATTEMPT_TIMEOUT_MS, ctx);
    validate_range(router.rate_window_ms, &ROUTER_RATE_WINDOW_MS, ctx);
    validate_range(router.registry_capacity, &ROUTER_REGISTRY_CAPACITY, ctx);
}

pub fn validate_scoring(scoring: &ScoringConfig, ctx: &mut ValidationCtx) {
    validate_range(scoring.latency_cap_ms, &SCORING_LATENCY_CAP_MS, ctx);
    validate_range(scoring.recovery_window_ms, &SCORING_RECOVERY_WINDOW_MS, ctx);
    validate_range(scoring.healthy_threshold, &SCORING_HEALTHY_THRESHOLD, ctx);
    validate_range(scoring.jitter_amplitude, &SCORING_JITTER_AMPLITUDE, ctx);

    let w = &scoring.weights;
    let weights = ScoreWeights {
        success_rate: w.success_rate,
        latency: w.latency,
        load: w.load,
        recovery: w.recovery,
    };

    let parts = [
        ("success_rate", w.success_rate),
        ("latency", w.latency),
        ("load", w.load),
        ("recovery", w.recovery),
    ];
    if let Some((name, value)) = parts.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
        ctx.push(ConfigError::InvalidWeights {
            reason: format!("weight '{name}' must be a non-negative number, got {value}"),
        });
    } else if !weights.is_convex() {
        ctx.push(ConfigError::InvalidWeights {
            reason: format!("weights must sum to 1.0, got {}", weights.sum()),
        });
    }
}

pub fn validate_circuit_breaker(cb: &CircuitBreakerConfig, ctx: &mut ValidationCtx) {
    validate_range(cb.failure_threshold, &CB_FAILURE_THRESHOLD, ctx);
    validate_range(cb.cooldown_ms, &CB_COOLDOWN_MS, ctx);
    validate_range(cb.max_cooldown_ms, &CB_MAX_COOLDOWN_MS, ctx);
    validate_range(cb.half_open_max_requests, &CB_HALF_OPEN_MAX_REQUESTS, ctx);

    if cb.max_cooldown_ms < cb.cooldown_ms {
        ctx.push(ConfigError::InvalidCircuitBreaker {
            reason: format!(
                "max_cooldown_ms ({}) must be at least cooldown_ms ({})",
                cb.max_cooldown_ms, cb.cooldown_ms
            ),
        });
    }
}

pub fn validate_endpoints(
    endpoints: &[EndpointConfig],
    router: &RouterConfig,
    ctx: &mut ValidationCtx,
) {
    let mut seen = HashSet::new();

    for endpoint in endpoints {
        if endpoint.id.trim().is_empty() {
            ctx.push(ConfigError::InvalidEndpoint {
                id: endpoint.id.clone(),
                reason: "id must not be empty".to_string(),
            });
        } else if !seen.insert(endpoint.id.as_str()) {
            ctx.push(ConfigError::DuplicateEndpoint {
                id: endpoint.id.clone(),
            });
        }

        if let Err(e) = parse_http_url(&endpoint.url) {
            ctx.push(ConfigError::InvalidEndpoint {
                id: endpoint.id.clone(),
                reason: e.to_string(),
            });
        }

        validate_range(endpoint.rate_ceiling, &ENDPOINT_RATE_CEILING, ctx);
    }

    if endpoints.len() > router.registry_capacity as usize {
        ctx.warn(format!(
            "{} endpoints configured but registry_capacity is {}; the lowest-scoring ones will be rejected",
            endpoints.len(),
            router.registry_capacity
        ));
    }
}

pub fn validate_discovery(discovery: &DiscoveryConfig, ctx: &mut ValidationCtx) {
    validate_range(discovery.interval_seconds, &DISCOVERY_INTERVAL_SECONDS, ctx);
    validate_range(discovery.batch_size, &DISCOVERY_BATCH_SIZE, ctx);
    validate_range(discovery.probe_timeout_ms, &DISCOVERY_PROBE_TIMEOUT_MS, ctx);

    if !discovery.probe_path.is_empty() && !discovery.probe_path.starts_with('/') {
        ctx.push(ConfigError::InvalidCandidate {
            url: discovery.probe_path.clone(),
            reason: "probe_path must start with '/'".to_string(),
        });
    }

    for candidate in &discovery.candidates {
        if let Err(e) = parse_http_url(&candidate.url) {
            ctx.push(ConfigError::InvalidCandidate {
                url: candidate.url.clone(),
                reason: e.to_string(),
            });
        }
        validate_range(candidate.rate_ceiling, &ENDPOINT_RATE_CEILING, ctx);
    }

    if discovery.enable && discovery.candidates.is_empty() {
        ctx.warn("discovery is enabled but no candidates are listed");
    }
}
