// Timestamp/value helpers: bisection over ordered primitives (spec.md
// §2 component table, §8 invariant 8). Primitive ids are dense and
// monotonically assigned (spec.md §3), so a log of n primitives is
// addressed by id in `0..n` and "ordered" means non-decreasing
// timestamp as id increases — exactly the shape binary search wants.

use crate::timestamp::Timestamp;

/// A comparison operator usable with [`timestamp_to_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

/// Minimal view of an ordered primitive log that bisection needs: how
/// many primitives there are, and each one's timestamp by id. Anything
/// backed by the (out-of-scope) tile store's id-ordered iterator can
/// implement this cheaply.
pub trait TimestampOrdered {
    fn len(&self) -> u64;
    fn timestamp_at(&self, id: u64) -> Timestamp;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Smallest id in `0..log.len()` with `log.timestamp_at(id) >= ts`, i.e.
/// the standard "lower bound" binary search.
fn lower_bound<L: TimestampOrdered + ?Sized>(log: &L, ts: Timestamp) -> u64 {
    let mut lo = 0u64;
    let mut hi = log.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if log.timestamp_at(mid) < ts {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Smallest id in `0..log.len()` with `log.timestamp_at(id) > ts`.
fn upper_bound<L: TimestampOrdered + ?Sized>(log: &L, ts: Timestamp) -> u64 {
    let mut lo = 0u64;
    let mut hi = log.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if log.timestamp_at(mid) <= ts {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Returns the unique boundary id satisfying `op` against `ts`, or
/// `None` (NO, per spec.md §7) if no such id exists (spec.md §8
/// invariant 8).
pub fn timestamp_to_id<L: TimestampOrdered + ?Sized>(log: &L, ts: Timestamp, op: Op) -> Option<u64> {
    if log.is_empty() {
        return None;
    }
    let n = log.len();
    match op {
        Op::Ge => {
            let lb = lower_bound(log, ts);
            (lb < n).then_some(lb)
        }
        Op::Gt => {
            let ub = upper_bound(log, ts);
            (ub < n).then_some(ub)
        }
        Op::Lt => {
            let lb = lower_bound(log, ts);
            (lb > 0).then(|| lb - 1)
        }
        Op::Le => {
            let ub = upper_bound(log, ts);
            (ub > 0).then(|| ub - 1)
        }
        Op::Eq => {
            let lb = lower_bound(log, ts);
            (lb < n && log.timestamp_at(lb) == ts).then_some(lb)
        }
        Op::Ne => {
            if log.timestamp_at(0) != ts {
                Some(0)
            } else {
                let ub = upper_bound(log, ts);
                (ub < n).then_some(ub)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    struct Log(Vec<Timestamp>);
    impl TimestampOrdered for Log {
        fn len(&self) -> u64 {
            self.0.len() as u64
        }
        fn timestamp_at(&self, id: u64) -> Timestamp {
            self.0[id as usize]
        }
    }

    fn s5_log() -> Log {
        Log(vec![100, 101, 103, 103, 105].into_iter().map(|s| Timestamp::from_parts(s, 0)).collect())
    }

    #[test]
    fn scenario_s5_bisection() {
        let log = s5_log();
        let t = |s| Timestamp::from_parts(s, 0);
        assert_eq!(timestamp_to_id(&log, t(103), Op::Eq), Some(2));
        assert_eq!(timestamp_to_id(&log, t(103), Op::Gt), Some(4));
        assert_eq!(timestamp_to_id(&log, t(102), Op::Ge), Some(2));
        assert_eq!(timestamp_to_id(&log, t(100), Op::Lt), None);
    }

    #[test]
    fn empty_log_is_always_no() {
        let log = Log(vec![]);
        let t = Timestamp::from_parts(1, 0);
        for op in [Op::Lt, Op::Le, Op::Eq, Op::Ge, Op::Gt, Op::Ne] {
            assert_eq!(timestamp_to_id(&log, t, op), None);
        }
    }

    #[test]
    fn ne_skips_matching_prefix() {
        let log = Log(vec![5, 5, 5, 7].into_iter().map(|s| Timestamp::from_parts(s, 0)).collect());
        assert_eq!(timestamp_to_id(&log, Timestamp::from_parts(5, 0), Op::Ne), Some(3));
        assert_eq!(timestamp_to_id(&log, Timestamp::from_parts(7, 0), Op::Ne), Some(0));
    }

    proptest::proptest! {
        #[test]
        fn bisection_matches_linear_scan(mut secs in proptest::collection::vec(0u64..50, 1..40), query in 0u64..50) {
            secs.sort_unstable();
            let log = Log(secs.iter().map(|s| Timestamp::from_parts(*s, 0)).collect());
            let ts = Timestamp::from_parts(query, 0);
            let n = log.len();
            for (op, predicate) in [
                (Op::Lt, (|a: u64, b: u64| a < b) as fn(u64, u64) -> bool),
                (Op::Le, |a, b| a <= b),
                (Op::Ge, |a, b| a >= b),
                (Op::Gt, |a, b| a > b),
            ] {
                let got = timestamp_to_id(&log, ts, op);
                let expect = match op {
                    Op::Lt | Op::Le => (0..n).rev().find(|&id| predicate(log.timestamp_at(id).seconds(), query)),
                    _ => (0..n).find(|&id| predicate(log.timestamp_at(id).seconds(), query)),
                };
                prop_assert_eq!(got, expect);
            }
        }
    }
}
