use crate::router::job::Dispatch;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tokio::time::Instant;

pub(crate) struct QueuedRequest {
    pub priority: i32,
    pub seq: u64,
    pub enqueued_at: Instant,
    pub job: Box<dyn Dispatch>,
}

impl PartialEq for QueuedRequest {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedRequest {}

impl PartialOrd for QueuedRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedRequest {
    // Max-heap: higher priority first, then lower sequence (FIFO).
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
pub(crate) struct RequestQueue {
    heap: BinaryHeap<QueuedRequest>,
}

impl RequestQueue {
    pub(crate) fn push(&mut self, req: QueuedRequest) {
        self.heap.push(req);
    }

    pub(crate) fn pop(&mut self) -> Option<QueuedRequest> {
        self.heap.pop()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = QueuedRequest> + '_ {
        self.heap.drain()
    }
}
