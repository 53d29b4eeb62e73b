// The session engine's scheduler decides *which* request runs next; it
// does not itself drive any socket I/O (that reactor loop is out of
// scope here — see spec.md §1). Sessions are visited round-robin by id
// and, within a session, the highest-priority runnable request for the
// requested stage goes first. A tick stops either when nothing is
// runnable or the budget runs out, whichever comes first.

use std::collections::BTreeMap;

use graphd_base::Budget;

use crate::request::Request;
use crate::session::Session;
use crate::stage::StageSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// At least one request ran to completion of its stage this tick.
    Progressed,
    /// Nothing was runnable for the requested stage.
    Idle,
    /// Budget ran out before every runnable request got a turn.
    More,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    sessions: BTreeMap<u64, Session>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    pub fn add_session(&mut self, session: Session) {
        self.sessions.insert(session.id(), session);
    }

    pub fn remove_session(&mut self, id: u64) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn session(&self, id: u64) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: u64) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Run one cooperative pass over every session for `stage`: each
    /// session's single best-priority runnable request gets a turn
    /// through `step` before moving to the next session, so no one
    /// session can monopolize a tick. `step` spends from `budget` and
    /// returns `true` once the request's `stage` work is actually done.
    pub fn run_tick(
        &mut self,
        stage: StageSet,
        budget: &mut Budget,
        mut step: impl FnMut(&mut Request, &mut Budget) -> bool,
    ) -> TickOutcome {
        let mut progressed = false;
        for session in self.sessions.values_mut() {
            if budget.is_exhausted() {
                return TickOutcome::More;
            }
            let Some(request) = Self::highest_priority_runnable(session, stage) else {
                continue;
            };
            if step(request, budget) {
                request.mark_done(stage);
                progressed = true;
            }
            session.recompute_scheduling_intent();
            session.reap_completed();
        }

        if budget.is_exhausted() {
            TickOutcome::More
        } else if progressed {
            TickOutcome::Progressed
        } else {
            TickOutcome::Idle
        }
    }

    fn highest_priority_runnable(session: &mut Session, stage: StageSet) -> Option<&mut Request> {
        let best_id = session
            .requests()
            .filter(|r| r.is_runnable(stage))
            .max_by_key(|r| r.priority())
            .map(|r| r.id())?;
        session.requests_mut().find(|r| r.id() == best_id)
    }
}
