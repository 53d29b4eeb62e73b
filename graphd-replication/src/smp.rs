// An SMP peer (another process sharing the same machine and primitive
// store) never applies writes itself: every request is passed straight
// through to the leader and the reply passed straight back (spec.md
// §4.3 "SMP passthrough"). Unlike write-through there is no local
// request to settle independently and no reconnect backoff — SMP peers
// share the leader's lifetime.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmpPassthrough {
    local_request_id: u64,
    leader_request_id: u64,
}

impl SmpPassthrough {
    pub fn new(local_request_id: u64, leader_request_id: u64) -> Self {
        SmpPassthrough { local_request_id, leader_request_id }
    }

    pub fn local_request_id(&self) -> u64 {
        self.local_request_id
    }

    pub fn leader_request_id(&self) -> u64 {
        self.leader_request_id
    }
}
