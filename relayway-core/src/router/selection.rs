use crate::circuit::CircuitBreaker;
use crate::registry::{Endpoint, EndpointId};
use crate::router::router::Shared;
use std::cmp::Ordering;
use std::collections::HashSet;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub endpoint: Endpoint,
    pub score: f64,
    /// Score after optional jitter; only used for ordering.
    pub rank: f64,
}

impl Shared {
    /// Endpoints that could take an attempt right now, best first.
    ///
    /// Excludes ids in `tried`, endpoints whose breaker would refuse a request, and
    /// endpoints whose rate window is exhausted or throttled.
    pub(crate) fn ranked_candidates(
        &self,
        tried: &HashSet<EndpointId>,
        now: Instant,
    ) -> Vec<Candidate> {
        let mut jitter = self.jitter.as_ref().map(|j| j.lock());

        let mut candidates: Vec<Candidate> = self
            .registry
            .all_at(now)
            .into_iter()
            .filter(|e| !tried.contains(&e.id))
            .filter(|e| e.has_capacity(now))
            .filter(|e| {
                self.breakers
                    .get(&e.id)
                    .map(|b| b.can_admit(&self.breaker_params, now))
                    .unwrap_or(true)
            })
            .map(|endpoint| {
                let score = self.scorer.score(&endpoint, now);
                let rank = match jitter.as_mut() {
                    Some(j) => j.perturb(score),
                    None => score,
                };
                Candidate {
                    endpoint,
                    score,
                    rank,
                }
            })
            .collect();

        candidates.sort_by(compare_candidates);
        candidates
    }

    pub(crate) fn next_candidate(
        &self,
        tried: &HashSet<EndpointId>,
        now: Instant,
    ) -> Option<Candidate> {
        self.ranked_candidates(tried, now).into_iter().next()
    }

    /// Breaker admission plus one unit of rate budget, or neither.
    pub(crate) fn admit(&self, id: &EndpointId, now: Instant) -> bool {
        let mut breaker = self
            .breakers
            .entry(id.clone())
            .or_insert_with(|| CircuitBreaker::new(&self.breaker_params));

        if !breaker.allow_request(id, &self.breaker_params, now) {
            return false;
        }

        if !self.registry.try_reserve(id, now) {
            breaker.release();
            return false;
        }

        true
    }
}

/// Rank descending, then endpoint priority descending, then registration order.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.rank
        .total_cmp(&a.rank)
        .then_with(|| b.endpoint.priority.cmp(&a.endpoint.priority))
        .then_with(|| a.endpoint.registered_seq.cmp(&b.endpoint.registered_seq))
}
