use serde::{Deserialize, Serialize};

/// Contents of `relayway.hcl`. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelaywayConfig {
    pub router: RouterConfig,
    pub scoring: ScoringConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub endpoints: Vec<EndpointConfig>,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    pub max_attempts: u32,
    pub min_request_interval_ms: u64,
    pub attempt_timeout_ms: u64,
    pub rate_window_ms: u64,
    pub registry_capacity: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_request_interval_ms: 500,
            attempt_timeout_ms: 10_000,
            rate_window_ms: 60_000,
            registry_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub latency_cap_ms: u64,
    pub recovery_window_ms: u64,
    pub healthy_threshold: f64,

    /// Seed for ranking jitter. Jitter is off when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter_seed: Option<u64>,
    pub jitter_amplitude: f64,

    pub weights: WeightsConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            latency_cap_ms: 5_000,
            recovery_window_ms: 300_000,
            healthy_threshold: 0.5,
            jitter_seed: None,
            jitter_amplitude: 0.05,
            weights: WeightsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightsConfig {
    pub success_rate: f64,
    pub latency: f64,
    pub load: f64,
    pub recovery: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            success_rate: 0.4,
            latency: 0.3,
            load: 0.2,
            recovery: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown_ms: u64,
    pub max_cooldown_ms: u64,
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 30_000,
            max_cooldown_ms: 300_000,
            half_open_max_requests: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub id: String,
    pub url: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_rate_ceiling")]
    pub rate_ceiling: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    pub enable: bool,
    pub interval_seconds: u64,
    pub batch_size: u32,
    pub probe_timeout_ms: u64,
    pub probe_path: String,
    pub candidates: Vec<CandidateConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enable: false,
            interval_seconds: 300,
            batch_size: 10,
            probe_timeout_ms: 5_000,
            probe_path: "/".to_string(),
            candidates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_rate_ceiling")]
    pub rate_ceiling: u32,
}

fn default_rate_ceiling() -> u32 {
    60
}
