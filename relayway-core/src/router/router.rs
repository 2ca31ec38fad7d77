use crate::circuit::{CircuitBreaker, CircuitBreakerParams, CircuitState};
use crate::health::{HealthScorer, ScoreJitter};
use crate::registry::{EndpointId, EndpointRegistry, EndpointSpec, Registration};
use crate::router::dispatcher::run_dispatcher;
use crate::router::job::{EndpointTarget, Job};
use crate::router::queue::QueuedRequest;
use crate::router::status::{EndpointStatus, RouterStatus};
use crate::router::RouterError;
use crate::upstream::UpstreamError;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Distinct endpoints tried per request before giving up.
    pub max_attempts: usize,
    /// Minimum spacing between two attempts on the same endpoint.
    pub min_request_interval: Duration,
    /// Upper bound for a single upstream attempt.
    pub attempt_timeout: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_request_interval: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// State shared between router handles and the dispatcher task.
pub(crate) struct Shared {
    pub registry: Arc<EndpointRegistry>,
    pub scorer: HealthScorer,
    pub breaker_params: CircuitBreakerParams,
    pub breakers: DashMap<EndpointId, CircuitBreaker>,
    pub settings: RouterSettings,
    pub jitter: Option<parking_lot::Mutex<ScoreJitter>>,
    pub queue_length: AtomicUsize,
}

/// Cheap, cloneable handle to one router instance.
///
/// The dispatcher task stops on [`Router::shutdown`] or when the last handle is dropped.
#[derive(Clone)]
pub struct Router {
    shared: Arc<Shared>,
    submissions: mpsc::UnboundedSender<QueuedRequest>,
    shutdown: Arc<watch::Sender<bool>>,
    next_seq: Arc<AtomicU64>,
}

/// A request that has been queued but not yet resolved.
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, RouterError>>,
}

impl<T> Pending<T> {
    pub async fn wait(self) -> Result<T, RouterError> {
        // A dropped reply means the dispatcher went away with the job.
        self.rx.await.unwrap_or(Err(RouterError::Shutdown))
    }

    pub async fn wait_timeout(self, limit: Duration) -> Result<T, RouterError> {
        match tokio::time::timeout(limit, self.rx).await {
            Ok(reply) => reply.unwrap_or(Err(RouterError::Shutdown)),
            Err(_) => Err(RouterError::Timeout(limit)),
        }
    }
}

impl Router {
    /// Start a router and its dispatcher. Must be called from within a tokio runtime.
    pub fn new(
        registry: Arc<EndpointRegistry>,
        scorer: HealthScorer,
        breaker_params: CircuitBreakerParams,
        settings: RouterSettings,
    ) -> Self {
        Self::start(registry, scorer, breaker_params, settings, None)
    }

    /// Like [`Router::new`], with seeded noise added to the selection ranking.
    pub fn with_jitter(
        registry: Arc<EndpointRegistry>,
        scorer: HealthScorer,
        breaker_params: CircuitBreakerParams,
        settings: RouterSettings,
        jitter: ScoreJitter,
    ) -> Self {
        Self::start(registry, scorer, breaker_params, settings, Some(jitter))
    }

    fn start(
        registry: Arc<EndpointRegistry>,
        scorer: HealthScorer,
        breaker_params: CircuitBreakerParams,
        settings: RouterSettings,
        jitter: Option<ScoreJitter>,
    ) -> Self {
        let shared = Arc::new(Shared {
            registry,
            scorer,
            breaker_params,
            breakers: DashMap::new(),
            settings,
            jitter: jitter.map(parking_lot::Mutex::new),
            queue_length: AtomicUsize::new(0),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(run_dispatcher(shared.clone(), rx, shutdown_rx));

        info!(
            event = "router_started",
            endpoints = shared.registry.len(),
            max_attempts = shared.settings.max_attempts,
            jitter = shared.jitter.is_some(),
        );

        Self {
            shared,
            submissions: tx,
            shutdown: Arc::new(shutdown_tx),
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue `op` and return immediately. The request competes on `priority` from
    /// this point on.
    pub fn enqueue<T, F, Fut>(&self, op: F, priority: i32) -> Result<Pending<T>, RouterError>
    where
        T: Send + 'static,
        F: Fn(EndpointTarget) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
    {
        if self.is_shut_down() {
            return Err(RouterError::Shutdown);
        }

        let (tx, rx) = oneshot::channel();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let request = QueuedRequest {
            priority,
            seq,
            enqueued_at: Instant::now(),
            job: Box::new(Job::new(op, tx)),
        };

        self.shared.queue_length.fetch_add(1, Ordering::Relaxed);
        if self.submissions.send(request).is_err() {
            self.shared.queue_length.fetch_sub(1, Ordering::Relaxed);
            return Err(RouterError::Shutdown);
        }

        debug!(seq = seq, priority = priority, "request queued");
        Ok(Pending { rx })
    }

    /// Route `op` to the best available endpoint, retrying elsewhere on failure.
    pub async fn submit<T, F, Fut>(&self, op: F, priority: i32) -> Result<T, RouterError>
    where
        T: Send + 'static,
        F: Fn(EndpointTarget) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
    {
        self.enqueue(op, priority)?.wait().await
    }

    /// Like [`Router::submit`], but gives up after `limit`. Only this caller is
    /// affected; the queued job is skipped once the dispatcher reaches it.
    pub async fn submit_with_timeout<T, F, Fut>(
        &self,
        op: F,
        priority: i32,
        limit: Duration,
    ) -> Result<T, RouterError>
    where
        T: Send + 'static,
        F: Fn(EndpointTarget) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
    {
        self.enqueue(op, priority)?.wait_timeout(limit).await
    }

    pub fn register(&self, spec: EndpointSpec) -> Registration {
        let registration = self.shared.registry.register(spec);
        self.forget_evicted(&registration);
        registration
    }

    /// Register an endpoint primed with a successful probe observation.
    pub fn register_seeded(&self, spec: EndpointSpec, probe_latency: Duration) -> Registration {
        let registration = self.shared.registry.register_seeded(spec, probe_latency);
        self.forget_evicted(&registration);
        registration
    }

    fn forget_evicted(&self, registration: &Registration) {
        if let Registration::Replaced { evicted } = registration {
            self.shared.breakers.remove(evicted);
        }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.shared.registry
    }

    pub fn scorer(&self) -> &HealthScorer {
        &self.shared.scorer
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.shared.settings
    }

    pub fn breaker_state(&self, id: &EndpointId) -> CircuitState {
        self.shared
            .breakers
            .get(id)
            .map(|b| b.state_at(Instant::now()))
            .unwrap_or(CircuitState::Closed)
    }

    pub fn queue_length(&self) -> usize {
        self.shared.queue_length.load(Ordering::Relaxed)
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stop the dispatcher. Requests still queued are rejected with
    /// [`RouterError::Shutdown`]; an attempt already in flight runs to completion.
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            info!(event = "router_shutdown", queued = self.queue_length());
        }
    }

    /// Resolves once [`Router::shutdown`] has been called.
    pub async fn closed(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Point-in-time view of every endpoint plus aggregates.
    pub fn status(&self) -> RouterStatus {
        let now = Instant::now();
        let shared = &self.shared;

        let endpoints: Vec<EndpointStatus> = shared
            .registry
            .all_at(now)
            .into_iter()
            .map(|endpoint| {
                let breaker = shared.breakers.get(&endpoint.id).map(|b| b.clone());
                let score = shared.scorer.score(&endpoint, now);
                EndpointStatus::new(&endpoint, score, breaker.as_ref(), &shared.scorer, now)
            })
            .collect();

        RouterStatus::new(endpoints, self.queue_length())
    }
}
