use crate::circuit::CallOutcome;
use crate::registry::{EndpointId, Outcome};
use crate::router::job::EndpointTarget;
use crate::router::queue::{QueuedRequest, RequestQueue};
use crate::router::router::Shared;
use crate::router::RouterError;
use crate::upstream::{FailureClass, UpstreamError};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

const NOTHING_AVAILABLE: &str =
    "no endpoint available: every endpoint is circuit-open or rate-exhausted";

/// Single consumer of the submission channel. Owns the priority heap and is the
/// only writer of endpoint counters and breaker state after an attempt.
pub(crate) async fn run_dispatcher(
    shared: Arc<Shared>,
    mut submissions: mpsc::UnboundedReceiver<QueuedRequest>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut queue = RequestQueue::default();
    debug!(event = "dispatcher_started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        // Everything submitted so far competes on priority.
        while let Ok(req) = submissions.try_recv() {
            queue.push(req);
        }

        let req = match queue.pop() {
            Some(req) => req,
            None => {
                tokio::select! {
                    biased;

                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }

                    received = submissions.recv() => match received {
                        Some(req) => queue.push(req),
                        None => break,
                    },
                }
                continue;
            }
        };

        shared.queue_length.fetch_sub(1, Ordering::Relaxed);

        if req.job.is_abandoned() {
            debug!(seq = req.seq, "caller gone, skipping queued request");
            continue;
        }

        execute(&shared, req).await;
    }

    submissions.close();
    while let Ok(req) = submissions.try_recv() {
        queue.push(req);
    }

    let mut rejected = 0usize;
    for req in queue.drain() {
        shared.queue_length.fetch_sub(1, Ordering::Relaxed);
        req.job.reject(RouterError::Shutdown);
        rejected += 1;
    }

    info!(event = "dispatcher_stopped", rejected = rejected);
}

async fn execute(shared: &Shared, mut req: QueuedRequest) {
    let max_attempts = shared.settings.max_attempts;
    let mut tried: HashSet<EndpointId> = HashSet::new();
    let mut attempted: Vec<EndpointId> = Vec::with_capacity(max_attempts);
    let mut last_error: Option<String> = None;

    while attempted.len() < max_attempts {
        if req.job.is_abandoned() {
            debug!(seq = req.seq, "caller gone mid-retry, dropping request");
            return;
        }

        let now = Instant::now();
        let Some(candidate) = shared.next_candidate(&tried, now) else {
            break;
        };

        let id = candidate.endpoint.id.clone();
        tried.insert(id.clone());

        // Respect upstream pacing: wait rather than skip.
        if let Some(ready_at) = shared
            .registry
            .next_attempt_at(&id, shared.settings.min_request_interval)
            && ready_at > now
        {
            sleep_until(ready_at).await;
        }

        // The caller may have given up during the wait.
        if req.job.is_abandoned() {
            debug!(seq = req.seq, endpoint = %id, "caller gone after pacing wait, dropping request");
            return;
        }

        let now = Instant::now();
        if !shared.admit(&id, now) {
            debug!(endpoint = %id, "endpoint no longer admits requests, skipping");
            continue;
        }

        attempted.push(id.clone());

        let target = EndpointTarget {
            id: id.clone(),
            url: candidate.endpoint.url.clone(),
        };

        let started = Instant::now();
        let result = match timeout(shared.settings.attempt_timeout, req.job.attempt(target)).await
        {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(shared.settings.attempt_timeout)),
        };
        let latency = started.elapsed();
        let finished = Instant::now();

        match result {
            Ok(()) => {
                shared
                    .registry
                    .record_outcome(&id, Outcome::success(latency));
                end_breaker_call(shared, &id, CallOutcome::Success, finished);

                debug!(
                    event = "request_routed",
                    endpoint = %id,
                    attempt = attempted.len(),
                    score = candidate.score,
                    latency_ms = latency.as_millis() as u64,
                    queued_ms = req.enqueued_at.elapsed().as_millis() as u64,
                );
                return;
            }

            Err(err) => {
                let class = err.class();
                shared
                    .registry
                    .record_outcome(&id, Outcome::failure(latency));
                end_breaker_call(shared, &id, CallOutcome::Failure(class), finished);

                if class == FailureClass::Throttled {
                    shared.registry.mark_throttled(&id, finished, err.retry_after());
                }

                warn!(
                    event = "attempt_failed",
                    endpoint = %id,
                    attempt = attempted.len(),
                    throttled = class == FailureClass::Throttled,
                    error = %err,
                );
                last_error = Some(err.to_string());
            }
        }
    }

    let attempted_endpoints: Vec<String> = attempted.iter().map(ToString::to_string).collect();
    let last_error = last_error.unwrap_or_else(|| NOTHING_AVAILABLE.to_string());

    warn!(
        event = "router_exhausted",
        attempted = ?attempted_endpoints,
        last_error = %last_error,
    );

    req.job.reject(RouterError::Exhausted {
        attempted_endpoints,
        last_error,
    });
}

/// Feed the result to the endpoint's breaker. A breaker removed by eviction while
/// the attempt was in flight stays removed.
fn end_breaker_call(shared: &Shared, id: &EndpointId, outcome: CallOutcome, now: Instant) {
    match shared.breakers.get_mut(id) {
        Some(mut breaker) => {
            breaker.on_request_end(id, &shared.breaker_params, true, outcome, now)
        }
        None => debug!(endpoint = %id, "endpoint evicted mid-attempt, outcome not fed to breaker"),
    }
}
