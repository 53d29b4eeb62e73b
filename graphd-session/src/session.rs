// A session owns one connection's request queue (spec.md §4.1). It is
// refcounted because a request can outlive the connection that issued
// it — a write-through request keeps its client session alive until the
// paired master-side apply acknowledges, for instance — and carries a
// scheduling-intent bitmask recording which stages it currently has
// outstanding work in, so the scheduler can skip idle sessions cheaply.

use std::collections::VecDeque;

use crate::request::Request;
use crate::stage::StageSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Client,
    Replica,
    SmpPeer,
}

#[derive(Debug)]
pub struct Session {
    id: u64,
    type_tag: SessionType,
    refcount: u32,
    queue: VecDeque<Request>,
    scheduling_intent: StageSet,
}

impl Session {
    pub fn new(id: u64, type_tag: SessionType) -> Self {
        Session { id, type_tag, refcount: 1, queue: VecDeque::new(), scheduling_intent: StageSet::NONE }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn type_tag(&self) -> SessionType {
        self.type_tag
    }

    pub fn retain(&mut self) {
        self.refcount += 1;
    }

    /// Drop one reference; returns `true` once the last one is gone and
    /// the session is safe to remove from the scheduler.
    pub fn release(&mut self) -> bool {
        self.refcount = self.refcount.saturating_sub(1);
        self.refcount == 0
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    pub fn enqueue(&mut self, request: Request) {
        self.scheduling_intent |= request.ready();
        self.queue.push_back(request);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// First queued request with `stage` currently runnable, if any.
    pub fn next_runnable(&mut self, stage: StageSet) -> Option<&mut Request> {
        self.queue.iter_mut().find(|r| r.is_runnable(stage))
    }

    /// Drop fully-complete requests from the front of the queue.
    pub fn reap_completed(&mut self) -> usize {
        let before = self.queue.len();
        self.queue.retain(|r| !r.is_complete());
        before - self.queue.len()
    }

    pub fn scheduling_intent(&self) -> StageSet {
        self.scheduling_intent
    }

    pub fn recompute_scheduling_intent(&mut self) {
        self.scheduling_intent =
            self.queue.iter().fold(StageSet::NONE, |acc, r| acc | r.ready().remove(r.done()));
    }

    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.queue.iter()
    }

    pub fn requests_mut(&mut self) -> impl Iterator<Item = &mut Request> {
        self.queue.iter_mut()
    }
}
