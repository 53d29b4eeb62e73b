// A write arriving at a read-only replica is not rejected outright: the
// replica pairs its local request with a forwarded copy sent to the
// write-master and depends on it, releasing its own reply once the
// master acks (spec.md §4.3 "write-through", GLOSSARY "depend"). If the
// master connection drops mid-flight, the pending write is cancelled
// and the replica backs off for [`RECONNECT_BACKOFF_SECONDS`] before
// trying to reconnect, so a flapping link doesn't turn into a
// reconnect storm.

use graphd_base::Timestamp;

pub const RECONNECT_BACKOFF_SECONDS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteThroughState {
    Pending,
    Forwarded { remote_request_id: u64 },
    Acked,
    Cancelled,
}

#[derive(Debug)]
pub struct WriteThrough {
    local_request_id: u64,
    state: WriteThroughState,
}

impl WriteThrough {
    pub fn new(local_request_id: u64) -> Self {
        WriteThrough { local_request_id, state: WriteThroughState::Pending }
    }

    pub fn local_request_id(&self) -> u64 {
        self.local_request_id
    }

    pub fn state(&self) -> WriteThroughState {
        self.state
    }

    pub fn forward(&mut self, remote_request_id: u64) {
        if matches!(self.state, WriteThroughState::Pending) {
            self.state = WriteThroughState::Forwarded { remote_request_id };
        }
    }

    pub fn ack(&mut self) -> bool {
        if matches!(self.state, WriteThroughState::Forwarded { .. }) {
            self.state = WriteThroughState::Acked;
            true
        } else {
            false
        }
    }

    /// The master connection dropped (or the client disconnected)
    /// before the write was acked: abandon it rather than replay it
    /// blindly, since the master may or may not have applied it.
    pub fn cancel(&mut self) {
        self.state = WriteThroughState::Cancelled;
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, WriteThroughState::Acked | WriteThroughState::Cancelled)
    }
}

/// Tracks when a replica is next allowed to retry connecting to its
/// write-master after a failure.
#[derive(Debug, Default)]
pub struct ReconnectBackoff {
    last_failure: Option<Timestamp>,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        ReconnectBackoff::default()
    }

    pub fn record_failure(&mut self, now: Timestamp) {
        self.last_failure = Some(now);
    }

    pub fn can_retry(&self, now: Timestamp) -> bool {
        match self.last_failure {
            None => true,
            Some(last) => now.seconds() >= last.seconds() + RECONNECT_BACKOFF_SECONDS,
        }
    }
}
