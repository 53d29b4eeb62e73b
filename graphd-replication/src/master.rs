// Master-side replica fan-out: handshake, catch-up, and live propagation
// (spec.md §4.3 "Master side"). This pairs `catchup`'s per-batch packer
// with the per-follower state (spec.md §3 "Replica Session Record")
// that decides *which* batch a follower needs next and, once caught up,
// coalesces further writes into it while preserving strictly-increasing
// delivery order (spec.md §8 invariant 2).

use graphd_base::{kind, ErrorKind, Result};
use graphd_model::Primitive;
use tracing::warn;

use crate::catchup::{next_catchup_batch, CatchUpBatch, PrimitiveLog, LAG_MAX};
use crate::live::LiveCoalescer;

/// How far back a freshly (re)connecting follower's `next_id` is rewound
/// before catch-up starts, so the initial restore batch re-verifies the
/// overlap with what the follower already applied rather than assuming
/// it lines up (spec.md §4.3 "master side" step 2).
pub const CATCHUP_REWIND: u64 = 256;

/// Per-connected-follower state (spec.md §3 "Replica Session Record").
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplicaSession {
    session_id: u64,
    next_id: u64,
    /// Set after a rewind, until the overlap-verify span
    /// `[next_id, start_id)` has been sent as one uncapped batch; only
    /// then does ordinary LAG_MAX-capped catch-up begin.
    verify_until: Option<u64>,
    live: bool,
    /// An outstanding `replica-write` enqueued for this follower but not
    /// yet transmitted, eligible for coalescing with the next one.
    pending_write: Option<(u64, u64)>,
    /// The actual primitive bytes backing `pending_write`. Scoping the
    /// coalescer to one follower's in-flight write, rather than sharing
    /// it across followers, is what makes its contents respect
    /// invariant #2: it only ever holds the strictly-increasing range
    /// `propagate_to_follower` is currently assembling for this session.
    payload: LiveCoalescer,
}

impl ReplicaSession {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn pending_write(&self) -> Option<(u64, u64)> {
        self.pending_write
    }

    /// Append a primitive to this follower's pending write payload. The
    /// caller is responsible for calling this once per primitive in
    /// `[start, end)` immediately after a `propagate_to_follower` call
    /// that returned `Enqueued` or `Coalesced`.
    pub fn push_payload(&mut self, primitive: Primitive, encoded_len: u64) {
        self.payload.push(primitive, encoded_len);
    }

    /// Take the accumulated payload once the pending write is ready to
    /// transmit, clearing both the payload and the pending-write marker.
    pub fn take_payload(&mut self) -> Vec<Primitive> {
        self.pending_write = None;
        self.payload.drain()
    }
}

/// What the master replies with immediately after a `replica` handshake
/// (spec.md §4.3 step 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterRole {
    WriteMaster(String),
    Archive,
    Standalone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeReply {
    pub version: u32,
    pub role: MasterRole,
}

/// Validate a `replica (start-id=N)` request against the master's
/// primitive count, rewind the follower's `next_id`, and produce the
/// session record plus handshake reply (spec.md §4.3 steps 1-3). Rejects
/// a `start_id` beyond what the master actually has.
pub fn replica_handshake(
    session_id: u64,
    start_id: u64,
    primitive_n: u64,
    role: MasterRole,
) -> Result<(ReplicaSession, HandshakeReply)> {
    if start_id > primitive_n {
        return Err(kind(
            ErrorKind::Syntax,
            format!("start-id {start_id} is beyond primitive_n {primitive_n}"),
        ));
    }
    let next_id = start_id.saturating_sub(CATCHUP_REWIND);
    let verify_until = (next_id < start_id).then_some(start_id);
    let session = ReplicaSession {
        session_id,
        next_id,
        verify_until,
        live: false,
        pending_write: None,
        payload: LiveCoalescer::new(),
    };
    let reply = HandshakeReply { version: 1, role };
    Ok((session, reply))
}

/// Drive one catch-up step for `session` against `log`, enqueuing a
/// `restore` batch (spec.md §4.3 step 4). The first batch after a
/// rewind covers the overlap-verify span uncapped; subsequent batches
/// are capped at [`LAG_MAX`] like ordinary catch-up. Once `next_id`
/// reaches the end of the log, the follower joins the live list
/// (spec.md §4.3 "then the follower session joins the live replica
/// list").
pub fn catch_up_step(session: &mut ReplicaSession, log: &impl PrimitiveLog) -> CatchUpBatch {
    if let Some(until) = session.verify_until {
        let mut primitives = Vec::new();
        let mut bytes = 0u64;
        let mut id = session.next_id;
        while id < until {
            if let Some(primitive) = log.primitive_at(id) {
                bytes += log.encoded_len(&primitive);
                primitives.push(primitive);
            }
            id += 1;
        }
        session.next_id = until;
        session.verify_until = None;
        let more = session.next_id < log.len();
        session.live = !more;
        return CatchUpBatch { primitives, bytes, more };
    }

    let batch = next_catchup_batch(log, session.next_id);
    session.next_id += batch.primitives.len() as u64;
    session.live = !batch.more;
    batch
}

/// Outcome of offering a newly committed primitive range to one live
/// follower (spec.md §4.3 "live propagation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateOutcome {
    /// A new `replica-write(start, end)` was enqueued.
    Enqueued,
    /// Coalesced into an already-pending, not-yet-transmitted write.
    Coalesced,
    /// The follower's `next_id` is already ahead; the range is a
    /// duplicate and was skipped.
    SkippedDuplicate,
    /// Coalescing would exceed LAG_MAX; the follower must be failed
    /// with "call me back when you can listen".
    FollowerOverLag,
    /// The follower is behind `start` with no matching pending write to
    /// extend — a gap that must not arise under invariant #2.
    Gap,
}

/// Offer primitive range `[start, end)` to one live follower, applying
/// the coalescing/duplicate-skip rules (spec.md §4.3 "For each live
/// follower session...").
pub fn propagate_to_follower(session: &mut ReplicaSession, start: u64, end: u64) -> PropagateOutcome {
    if session.next_id > start {
        warn!(target: "graphd", next_id = session.next_id, start, "duplicate replica-write skipped");
        return PropagateOutcome::SkippedDuplicate;
    }

    if session.next_id == start {
        if let Some((old_start, old_end)) = session.pending_write {
            if old_end != start {
                return PropagateOutcome::Gap;
            }
            if end - old_start > LAG_MAX {
                return PropagateOutcome::FollowerOverLag;
            }
            session.pending_write = Some((old_start, end));
            return PropagateOutcome::Coalesced;
        }
        session.pending_write = Some((start, end));
        return PropagateOutcome::Enqueued;
    }

    PropagateOutcome::Gap
}

/// Verify that `[start, end)` begins a transaction before fanning it out
/// (spec.md §4.3 "it verifies that start begins a transaction ...; if
/// not, the entire replica fleet is disconnected as unrecoverable").
pub fn verify_transaction_start(start_primitive: &Primitive) -> Result<()> {
    if start_primitive.is_transaction_start {
        Ok(())
    } else {
        Err(kind(
            ErrorKind::Corruption,
            "replicate_primitives: range does not begin a transaction; replica fleet disconnected",
        ))
    }
}

/// Fan a freshly committed range out to every live follower, after
/// checking the transaction-start invariant once for the whole fleet
/// (spec.md §4.3 "Live propagation").
pub fn replicate_primitives(
    followers: &mut [ReplicaSession],
    start_primitive: &Primitive,
    start: u64,
    end: u64,
) -> Result<Vec<(u64, PropagateOutcome)>> {
    verify_transaction_start(start_primitive)?;
    Ok(followers
        .iter_mut()
        .filter(|f| f.is_live())
        .map(|f| (f.session_id(), propagate_to_follower(f, start, end)))
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;
    use graphd_base::Timestamp;
    use graphd_model::{Guid, ValueType};

    struct FakeLog {
        sizes: Vec<u64>,
    }

    fn primitive(id: u64) -> Primitive {
        Primitive {
            id,
            guid: Guid(id as u128),
            timestamp: Timestamp::from_parts(id, 0),
            valuetype: ValueType::Unspecified,
            typeguid: None,
            left: None,
            right: None,
            scope: None,
            previous: None,
            generation: None,
            name: Vec::new(),
            value: Vec::new(),
            live: true,
            archival: false,
            is_node: true,
            is_transaction_start: true,
        }
    }

    impl PrimitiveLog for FakeLog {
        fn len(&self) -> u64 {
            self.sizes.len() as u64
        }
        fn primitive_at(&self, id: u64) -> Option<Primitive> {
            (id < self.len()).then(|| primitive(id))
        }
        fn encoded_len(&self, primitive: &Primitive) -> u64 {
            self.sizes[primitive.id as usize]
        }
    }

    fn batch_range(batch: &CatchUpBatch) -> Option<(u64, u64)> {
        let first = batch.primitives.first()?.id;
        let last = batch.primitives.last()?.id;
        Some((first, last + 1))
    }

    #[test]
    fn scenario_s3_catchup_rewind_and_batching() {
        // 1300 primitives, 1 KiB each, so LAG_MAX (128 KiB) caps an
        // ordinary catch-up batch at exactly 128 primitives.
        let log = FakeLog { sizes: vec![1024; 1300] };
        let (mut session, reply) =
            replica_handshake(1, 1000, 1300, MasterRole::WriteMaster("master.example:8100".into())).unwrap();
        assert_eq!(session.next_id(), 744);
        assert_eq!(reply.role, MasterRole::WriteMaster("master.example:8100".into()));

        let b1 = catch_up_step(&mut session, &log);
        assert_eq!(batch_range(&b1), Some((744, 1000)));
        assert!(b1.more);
        assert!(!session.is_live());

        let b2 = catch_up_step(&mut session, &log);
        assert_eq!(batch_range(&b2), Some((1000, 1128)));
        assert!(b2.more);

        let b3 = catch_up_step(&mut session, &log);
        assert_eq!(batch_range(&b3), Some((1128, 1256)));
        assert!(b3.more);

        let b4 = catch_up_step(&mut session, &log);
        assert_eq!(batch_range(&b4), Some((1256, 1300)));
        assert!(!b4.more);
        assert!(session.is_live());
    }

    #[test]
    fn handshake_rejects_start_id_beyond_primitive_n() {
        let err = replica_handshake(1, 2000, 1300, MasterRole::Archive).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn handshake_without_rewind_skips_verify_batch() {
        let log = FakeLog { sizes: vec![10; 50] };
        let (mut session, _) = replica_handshake(2, 10, 1300, MasterRole::Standalone).unwrap();
        assert_eq!(session.next_id(), 0);
        let batch = catch_up_step(&mut session, &log);
        assert_eq!(batch_range(&batch), Some((0, 50)));
        assert!(!batch.more);
    }

    fn live_session(next_id: u64) -> ReplicaSession {
        ReplicaSession {
            session_id: 9,
            next_id,
            verify_until: None,
            live: true,
            pending_write: None,
            payload: LiveCoalescer::new(),
        }
    }

    #[test]
    fn matching_next_id_enqueues_a_new_write() {
        let mut f = live_session(100);
        assert_eq!(propagate_to_follower(&mut f, 100, 150), PropagateOutcome::Enqueued);
        assert_eq!(f.pending_write(), Some((100, 150)));
    }

    #[test]
    fn untransmitted_write_coalesces_with_the_next_one() {
        let mut f = live_session(100);
        assert_eq!(propagate_to_follower(&mut f, 100, 150), PropagateOutcome::Enqueued);
        assert_eq!(propagate_to_follower(&mut f, 150, 200), PropagateOutcome::Coalesced);
        assert_eq!(f.pending_write(), Some((100, 200)));
    }

    #[test]
    fn ahead_follower_skips_duplicate_range() {
        let mut f = live_session(500);
        assert_eq!(propagate_to_follower(&mut f, 100, 150), PropagateOutcome::SkippedDuplicate);
    }

    #[test]
    fn coalescing_past_lag_max_fails_the_follower() {
        let mut f = live_session(100);
        assert_eq!(propagate_to_follower(&mut f, 100, 100 + LAG_MAX), PropagateOutcome::Enqueued);
        assert_eq!(propagate_to_follower(&mut f, 100 + LAG_MAX, 100 + LAG_MAX + 1), PropagateOutcome::FollowerOverLag);
    }

    #[test]
    fn non_transaction_start_disconnects_the_fleet() {
        let mut followers = vec![live_session(100)];
        let mut bad = primitive(100);
        bad.is_transaction_start = false;
        let err = replicate_primitives(&mut followers, &bad, 100, 150).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn replicate_primitives_fans_out_to_every_live_follower() {
        let mut followers = vec![live_session(100), live_session(100)];
        let start = primitive(100);
        let outcomes = replicate_primitives(&mut followers, &start, 100, 150).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, o)| *o == PropagateOutcome::Enqueued));
    }
}
