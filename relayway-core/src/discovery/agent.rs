use crate::discovery::{DiscoveryCandidate, ProbeError, ProbeFeatures, Prober};
use crate::registry::{Endpoint, EndpointId, EndpointSpec, Outcome, Registration};
use crate::router::Router;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, timeout};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Max probes in flight at once.
    pub batch_size: usize,
    pub probe_timeout: Duration,
    pub probe_path: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            probe_timeout: Duration::from_secs(5),
            probe_path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredEndpoint {
    pub id: EndpointId,
    pub url: String,
    pub status: u16,
    #[serde(serialize_with = "crate::discovery::serialize_ms")]
    pub latency: Duration,
    pub initial_score: f64,
    pub features: ProbeFeatures,
    pub registration: Registration,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedProbe {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    pub discovered: Vec<DiscoveredEndpoint>,
    pub failed: Vec<FailedProbe>,
    /// Candidates whose id was already registered; not probed again.
    pub skipped: Vec<EndpointId>,
}

impl DiscoveryReport {
    pub fn registered_count(&self) -> usize {
        self.discovered
            .iter()
            .filter(|d| {
                matches!(
                    d.registration,
                    Registration::Added | Registration::Replaced { .. }
                )
            })
            .count()
    }
}

/// Probes candidate URLs and registers the ones that answer with the router.
#[derive(Clone)]
pub struct DiscoveryAgent {
    router: Router,
    prober: Arc<dyn Prober>,
    settings: DiscoverySettings,
}

enum ProbeOutcome {
    Found(DiscoveredEndpoint),
    Failed(FailedProbe),
    Skipped(EndpointId),
}

impl DiscoveryAgent {
    pub fn new(router: Router, prober: Arc<dyn Prober>, settings: DiscoverySettings) -> Self {
        Self {
            router,
            prober,
            settings,
        }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Probe every candidate once, `batch_size` at a time, and register the
    /// responsive ones. Failures are logged and listed; this never errors.
    pub async fn run_once(&self, candidates: &[DiscoveryCandidate]) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let batch_size = self.settings.batch_size.max(1);

        for batch in candidates.chunks(batch_size) {
            let outcomes = join_all(batch.iter().map(|c| self.probe_candidate(c))).await;

            for outcome in outcomes {
                match outcome {
                    ProbeOutcome::Found(found) => report.discovered.push(found),
                    ProbeOutcome::Failed(failed) => report.failed.push(failed),
                    ProbeOutcome::Skipped(id) => report.skipped.push(id),
                }
            }
        }

        info!(
            event = "discovery_completed",
            candidates = candidates.len(),
            registered = report.registered_count(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
        );

        report
    }

    async fn probe_candidate(&self, candidate: &DiscoveryCandidate) -> ProbeOutcome {
        let spec = match candidate.to_spec() {
            Ok(spec) => spec,
            Err(e) => return self.failed(candidate, e),
        };

        if self.router.registry().contains(&spec.id) {
            debug!(endpoint = %spec.id, "candidate already registered, not probing");
            return ProbeOutcome::Skipped(spec.id);
        }

        let probe = match timeout(self.settings.probe_timeout, self.prober.probe(&spec.url)).await {
            Ok(Ok(probe)) => probe,
            Ok(Err(e)) => return self.failed(candidate, e),
            Err(_) => return self.failed(candidate, ProbeError::Timeout(self.settings.probe_timeout)),
        };

        let initial_score = self.initial_score(&spec, probe.latency);
        let registration = self.router.register_seeded(spec.clone(), probe.latency);

        info!(
            event = "endpoint_discovered",
            endpoint = %spec.id,
            url = %spec.url,
            latency_ms = probe.latency.as_millis() as u64,
            initial_score = initial_score,
            json = probe.features.json_body,
            registration = ?registration,
        );

        ProbeOutcome::Found(DiscoveredEndpoint {
            id: spec.id,
            url: spec.url,
            status: probe.status,
            latency: probe.latency,
            initial_score,
            features: probe.features,
            registration,
        })
    }

    fn failed(&self, candidate: &DiscoveryCandidate, error: ProbeError) -> ProbeOutcome {
        warn!(
            event = "probe_failed",
            url = %candidate.url,
            error = %error,
        );

        ProbeOutcome::Failed(FailedProbe {
            url: candidate.url.clone(),
            error: error.to_string(),
        })
    }

    /// Score of a fresh endpoint seeded with one successful observation.
    fn initial_score(&self, spec: &EndpointSpec, latency: Duration) -> f64 {
        let now = Instant::now();
        let mut endpoint = Endpoint::new(spec.clone(), now);
        endpoint.record(Outcome::success(latency), now);
        self.router.scorer().score(&endpoint, now)
    }

    /// Re-run discovery every `interval` until the task is aborted or the router
    /// shuts down. The first pass starts immediately.
    pub fn spawn(self, candidates: Vec<DiscoveryCandidate>, interval: Duration) -> JoinHandle<()> {
        self.spawn_from(candidates, Instant::now(), interval)
    }

    /// Like [`DiscoveryAgent::spawn`], but the first pass waits one `interval`.
    /// For callers that already ran [`DiscoveryAgent::run_once`].
    pub fn spawn_after(
        self,
        candidates: Vec<DiscoveryCandidate>,
        interval: Duration,
    ) -> JoinHandle<()> {
        self.spawn_from(candidates, Instant::now() + interval, interval)
    }

    fn spawn_from(
        self,
        candidates: Vec<DiscoveryCandidate>,
        start: Instant,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.router.closed() => break,
                    _ = ticker.tick() => {
                        self.run_once(&candidates).await;
                    }
                }
            }

            debug!(event = "discovery_stopped");
        })
    }
}
