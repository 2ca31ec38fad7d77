use crate::conf::ConfigError;
use crate::conf::validation::ValidationCtx;

#[derive(Debug, Clone)]
pub struct RangeConstraint<T> {
    pub min: T,
    pub max: T,
    pub label: &'static str,
    pub units: Option<&'static str>,
}

//-----------------------------------------------------------------------------
// router
//-----------------------------------------------------------------------------
pub const ROUTER_MAX_ATTEMPTS: RangeConstraint<u32> = RangeConstraint {
    min: 1,
    max: 100,
    label: "router.max_attempts",
    units: None,
};

pub const ROUTER_MIN_REQUEST_INTERVAL_MS: RangeConstraint<u64> = RangeConstraint {
    min: 0,
    max: 60 * 1000,
    label: "router.min_request_interval_ms",
    units: Some("ms"),
};

pub const ROUTER_ATTEMPT_TIMEOUT_MS: RangeConstraint<u64> = RangeConstraint {
    min: 1,
    max: 10 * 60 * 1000,
    label: "router.attempt_timeout_ms",
    units: Some("ms"),
};

pub const ROUTER_RATE_WINDOW_MS: RangeConstraint<u64> = RangeConstraint {
    min: 1,
    max: 24 * 60 * 60 * 1000,
    label: "router.rate_window_ms",
    units: Some("ms"),
};

pub const ROUTER_REGISTRY_CAPACITY: RangeConstraint<u32> = RangeConstraint {
    min: 1,
    max: 10_000,
    label: "router.registry_capacity",
    units: None,
};

//-----------------------------------------------------------------------------
// scoring
//-----------------------------------------------------------------------------
pub const SCORING_LATENCY_CAP_MS: RangeConstraint<u64> = RangeConstraint {
    min: 1,
    max: 10 * 60 * 1000,
    label: "scoring.latency_cap_ms",
    units: Some("ms"),
};

pub const SCORING_RECOVERY_WINDOW_MS: RangeConstraint<u64> = RangeConstraint {
    min: 1,
    max: 24 * 60 * 60 * 1000,
    label: "scoring.recovery_window_ms",
    units: Some("ms"),
};

pub const SCORING_HEALTHY_THRESHOLD: RangeConstraint<f64> = RangeConstraint {
    min: 0.0,
    max: 1.0,
    label: "scoring.healthy_threshold",
    units: None,
};

pub const SCORING_JITTER_AMPLITUDE: RangeConstraint<f64> = RangeConstraint {
    min: 0.0,
    max: 1.0,
    label: "scoring.jitter_amplitude",
    units: None,
};

//-----------------------------------------------------------------------------
// circuit_breaker
//-----------------------------------------------------------------------------
pub const CB_FAILURE_THRESHOLD: RangeConstraint<u32> = RangeConstraint {
    min: 1,
    max: 10_000,
    label: "circuit_breaker.failure_threshold",
    units: None,
};

pub const CB_COOLDOWN_MS: RangeConstraint<u64> = RangeConstraint {
    min: 1,
    max: 60 * 60 * 1000,
    label: "circuit_breaker.cooldown_ms",
    units: Some("ms"),
};

pub const CB_MAX_COOLDOWN_MS: RangeConstraint<u64> = RangeConstraint {
    min: 1,
    max: 24 * 60 * 60 * 1000,
    label: "circuit_breaker.max_cooldown_ms",
    units: Some("ms"),
};

pub const CB_HALF_OPEN_MAX_REQUESTS: RangeConstraint<u32> = RangeConstraint {
    min: 1,
    max: 10_000,
    label: "circuit_breaker.half_open_max_requests",
    units: None,
};

//-----------------------------------------------------------------------------
// endpoints / discovery
//-----------------------------------------------------------------------------
pub const ENDPOINT_RATE_CEILING: RangeConstraint<u32> = RangeConstraint {
    min: 1,
    max: 1_000_000,
    label: "endpoint.rate_ceiling",
    units: None,
};

pub const DISCOVERY_INTERVAL_SECONDS: RangeConstraint<u64> = RangeConstraint {
    min: 1,
    max: 24 * 60 * 60,
    label: "discovery.interval_seconds",
    units: Some("s"),
};

pub const DISCOVERY_BATCH_SIZE: RangeConstraint<u32> = RangeConstraint {
    min: 1,
    max: 1_000,
    label: "discovery.batch_size",
    units: None,
};

pub const DISCOVERY_PROBE_TIMEOUT_MS: RangeConstraint<u64> = RangeConstraint {
    min: 1,
    max: 10 * 60 * 1000,
    label: "discovery.probe_timeout_ms",
    units: Some("ms"),
};

pub fn validate_range<T>(value: T, constraint: &RangeConstraint<T>, ctx: &mut ValidationCtx)
where
    T: PartialOrd + std::fmt::Display,
{
    // Written so that NaN falls outside every range.
    let in_range = value >= constraint.min && value <= constraint.max;
    if !in_range {
        ctx.push(ConfigError::OutOfRange {
            label: constraint.label,
            value: value.to_string(),
            min: constraint.min.to_string(),
            max: constraint.max.to_string(),
            units: constraint.units.unwrap_or(""),
        });
    }
}
