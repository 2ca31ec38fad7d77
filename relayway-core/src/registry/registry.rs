use crate::health::HealthScorer;
use crate::registry::endpoint::{Endpoint, EndpointId, EndpointSpec, Outcome};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Registration {
    Added,
    Duplicate,
    /// Registry was full; the lowest-scoring endpoint made room.
    Replaced { evicted: EndpointId },
    /// Registry was full and the newcomer scored below every resident.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub capacity: usize,
    pub rate_window: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            capacity: 64,
            rate_window: Duration::from_secs(60),
        }
    }
}

/// Authoritative set of known endpoints and their runtime counters.
#[derive(Debug)]
pub struct EndpointRegistry {
    endpoints: DashMap<EndpointId, Endpoint>,
    settings: RegistrySettings,
    scorer: HealthScorer,
    next_seq: AtomicU64,

    /// Serializes inserts so the capacity check and eviction are atomic.
    insert_lock: Mutex<()>,
}

impl EndpointRegistry {
    pub fn new(settings: RegistrySettings, scorer: HealthScorer) -> Self {
        Self {
            endpoints: DashMap::new(),
            settings,
            scorer,
            next_seq: AtomicU64::new(0),
            insert_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn capacity(&self) -> usize {
        self.settings.capacity
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn contains(&self, id: &EndpointId) -> bool {
        self.endpoints.contains_key(id)
    }

    pub fn register(&self, spec: EndpointSpec) -> Registration {
        self.insert(Endpoint::new(spec, Instant::now()))
    }

    /// Register an endpoint primed with one successful observation, as produced by a
    /// discovery probe.
    pub fn register_seeded(&self, spec: EndpointSpec, probe_latency: Duration) -> Registration {
        let now = Instant::now();
        let mut endpoint = Endpoint::new(spec, now);
        endpoint.record(Outcome::success(probe_latency), now);
        self.insert(endpoint)
    }

    fn insert(&self, mut endpoint: Endpoint) -> Registration {
        let _guard = self.insert_lock.lock();

        if self.endpoints.contains_key(&endpoint.id) {
            debug!(endpoint = %endpoint.id, "endpoint already registered");
            return Registration::Duplicate;
        }

        let mut registration = Registration::Added;

        if self.endpoints.len() >= self.settings.capacity {
            let now = Instant::now();
            let incoming = self.scorer.score(&endpoint, now);

            let lowest = self
                .all()
                .into_iter()
                .map(|e| (self.scorer.score(&e, now), e.id))
                .min_by(|a, b| a.0.total_cmp(&b.0));

            match lowest {
                Some((score, evicted)) if incoming >= score => {
                    self.endpoints.remove(&evicted);
                    info!(
                        event = "endpoint_evicted",
                        endpoint = %evicted,
                        score = score,
                        replacement = %endpoint.id,
                    );
                    registration = Registration::Replaced { evicted };
                }
                _ => {
                    warn!(
                        endpoint = %endpoint.id,
                        capacity = self.settings.capacity,
                        "registry full, endpoint rejected"
                    );
                    return Registration::Rejected;
                }
            }
        }

        endpoint.registered_seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        info!(
            event = "endpoint_registered",
            endpoint = %endpoint.id,
            url = %endpoint.url,
            rate_ceiling = endpoint.rate_ceiling,
        );
        self.endpoints.insert(endpoint.id.clone(), endpoint);

        registration
    }

    /// Snapshot of every endpoint in registration order, with rate windows rolled
    /// forward to now. Stored counters are not modified.
    pub fn all(&self) -> Vec<Endpoint> {
        self.all_at(Instant::now())
    }

    pub fn all_at(&self, now: Instant) -> Vec<Endpoint> {
        let mut endpoints: Vec<Endpoint> = self
            .endpoints
            .iter()
            .map(|e| {
                let mut e = e.value().clone();
                e.roll_window(now, self.settings.rate_window);
                e
            })
            .collect();

        endpoints.sort_by_key(|e| e.registered_seq);
        endpoints
    }

    pub fn get(&self, id: &EndpointId) -> Option<Endpoint> {
        self.endpoints.get(id).map(|e| {
            let mut e = e.value().clone();
            e.roll_window(Instant::now(), self.settings.rate_window);
            e
        })
    }

    /// Feed an attempt result back. Unknown ids are logged and ignored.
    pub fn record_outcome(&self, id: &EndpointId, outcome: Outcome) {
        match self.endpoints.get_mut(id) {
            Some(mut e) => e.record(outcome, Instant::now()),
            None => warn!(endpoint = %id, "outcome recorded for unknown endpoint"),
        }
    }

    /// Count one attempt against the endpoint's window if it still has budget.
    pub fn try_reserve(&self, id: &EndpointId, now: Instant) -> bool {
        let Some(mut e) = self.endpoints.get_mut(id) else {
            return false;
        };

        e.roll_window(now, self.settings.rate_window);
        if !e.has_capacity(now) {
            return false;
        }

        e.current_window_count += 1;
        e.last_attempt_at = Some(now);
        true
    }

    /// Earliest instant the next attempt may start, given a minimum spacing.
    pub fn next_attempt_at(&self, id: &EndpointId, min_interval: Duration) -> Option<Instant> {
        self.endpoints
            .get(id)
            .and_then(|e| e.last_attempt_at)
            .map(|last| last + min_interval)
    }

    /// Exclude the endpoint until its current window ends (or the provider's
    /// retry hint, if that is later).
    pub fn mark_throttled(&self, id: &EndpointId, now: Instant, retry_after: Option<Duration>) {
        let Some(mut e) = self.endpoints.get_mut(id) else {
            warn!(endpoint = %id, "throttle reported for unknown endpoint");
            return;
        };

        e.roll_window(now, self.settings.rate_window);
        let window_end = e.window_started_at + self.settings.rate_window;
        let until = match retry_after {
            Some(hint) => window_end.max(now + hint),
            None => window_end,
        };

        e.throttled_until = Some(until);
        debug!(
            endpoint = %id,
            throttled_for_ms = until.saturating_duration_since(now).as_millis() as u64,
            "endpoint throttled"
        );
    }
}
