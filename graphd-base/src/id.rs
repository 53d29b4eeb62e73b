// Session ids and request ids are drawn from the same monotonic sequence
// (spec.md §3, "Request ... Identified by id (drawn from the same
// sequence as session ids)"). `IdSequence` is the single counter type
// both `graphd-session`'s sessions and requests allocate from.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub u64);

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monotonic, process-wide-shareable id counter. Cheap to clone (an
/// `Arc` around an atomic), so session and request allocators can hold
/// their own handle onto the same underlying sequence.
#[derive(Debug, Clone, Default)]
pub struct IdSequence(std::sync::Arc<AtomicU64>);

impl IdSequence {
    pub fn new() -> Self {
        Self(std::sync::Arc::new(AtomicU64::new(1)))
    }

    pub fn next(&self) -> Id {
        Id(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Standalone helper for call sites that only need a single id and don't
/// want to carry an `IdSequence` around (tests, one-off tools).
pub fn next_unique_id(seq: &IdSequence) -> Id {
    seq.next()
}
