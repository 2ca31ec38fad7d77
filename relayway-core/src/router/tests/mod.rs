mod exhaustion;
mod rate_limit;

use crate::circuit::CircuitBreakerParams;
use crate::health::HealthScorer;
use crate::registry::{EndpointRegistry, EndpointSpec, RegistrySettings};
use crate::router::{EndpointTarget, Router, RouterSettings};
use crate::upstream::UpstreamError;
use futures::future::{Ready, ready};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------
// Helpers
// ---------------------------

/// Every attempt an operation saw, in order, by endpoint id.
#[derive(Clone, Default)]
pub(super) struct CallLog(Arc<parking_lot::Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, id: &str) {
        self.0.lock().push(id.to_string());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, id: &str) -> usize {
        self.0.lock().iter().filter(|c| c.as_str() == id).count()
    }
}

pub(super) fn spec(id: &str, rate_ceiling: u32) -> EndpointSpec {
    EndpointSpec::new(id, format!("http://{id}.invalid"), rate_ceiling)
}

pub(super) fn fast_settings() -> RouterSettings {
    RouterSettings {
        max_attempts: 3,
        min_request_interval: Duration::ZERO,
        attempt_timeout: Duration::from_secs(1),
    }
}

pub(super) fn router_with(
    specs: Vec<EndpointSpec>,
    settings: RouterSettings,
    breaker: CircuitBreakerParams,
) -> Router {
    let registry = Arc::new(EndpointRegistry::new(
        RegistrySettings {
            capacity: 64,
            rate_window: Duration::from_secs(60),
        },
        HealthScorer::default(),
    ));

    for spec in specs {
        registry.register(spec);
    }

    Router::new(registry, HealthScorer::default(), breaker, settings)
}

pub(super) fn router(specs: Vec<EndpointSpec>) -> Router {
    router_with(specs, fast_settings(), CircuitBreakerParams::default())
}

/// An operation that logs the endpoint and answers according to `script`.
pub(super) fn scripted<S>(
    log: &CallLog,
    script: S,
) -> impl Fn(EndpointTarget) -> Ready<Result<String, UpstreamError>> + Send + 'static
where
    S: Fn(&str) -> Result<(), UpstreamError> + Send + 'static,
{
    let log = log.clone();
    move |target: EndpointTarget| {
        log.record(&target.id.0);
        ready(script(&target.id.0).map(|_| target.id.0))
    }
}

pub(super) fn always_ok(_: &str) -> Result<(), UpstreamError> {
    Ok(())
}

pub(super) fn always_500(_: &str) -> Result<(), UpstreamError> {
    Err(UpstreamError::HttpStatus(500))
}
