// A replica that detects it can never catch up cleanly (a corrupted
// primitive, an impossible timestamp regression from its master) writes
// an epitaph and stops applying further writes rather than risk
// diverging silently (spec.md §4.3, §8 invariant 6: "a replica that
// cannot apply a write honestly must stop, not guess").

use graphd_base::{Error, ErrorKind, Timestamp};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epitaph {
    pub reason: String,
    pub at: Timestamp,
}

/// Record a fatal replication fault. Logs at error level on construction
/// (mirrors [`graphd_base::Error::new`]'s own logging, since an epitaph
/// is never retried or recovered from locally) and returns the
/// corruption [`Error`] to propagate to whatever caller is tearing the
/// connection down.
pub fn epitaph(reason: impl Into<String>, at: Timestamp) -> (Epitaph, Error) {
    let reason = reason.into();
    error!(target: "graphd", %reason, at = %at.format(), "replica epitaph: halting replay");
    let err = graphd_base::kind(ErrorKind::Corruption, reason.clone());
    (Epitaph { reason, at }, err)
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn epitaph_carries_corruption_kind() {
        let (tombstone, err) = epitaph("timestamp regression from master", Timestamp::from_parts(10, 0));
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert_eq!(tombstone.reason, "timestamp regression from master");
    }
}
