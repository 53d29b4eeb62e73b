mod catchup;
mod epitaph;
mod live;
mod master;
mod smp;
mod write_through;

pub use catchup::{next_catchup_batch, CatchUpBatch, PrimitiveLog, LAG_MAX};
pub use epitaph::{epitaph, Epitaph};
pub use live::LiveCoalescer;
pub use master::{
    catch_up_step, propagate_to_follower, replica_handshake, replicate_primitives, HandshakeReply, MasterRole,
    PropagateOutcome, ReplicaSession, CATCHUP_REWIND,
};
pub use smp::SmpPassthrough;
pub use write_through::{ReconnectBackoff, WriteThrough, WriteThroughState, RECONNECT_BACKOFF_SECONDS};
