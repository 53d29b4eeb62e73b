// The constraint clause merger folds parsed clause AST into a canonical
// constraint with converged bounds/flags (spec.md §3, §4 "Constraint
// Clause Merger"). Constraints are merged pairwise: a clause merges into
// an accumulator built from its ancestors/siblings; contradictions flip
// `is_false` and the subtree is pruned rather than erroring.

use graphd_model::{Bound, Constraint, GuidPredicate};
use tracing::trace;

/// The hard ceiling on a constraint's result count, independent of
/// anything already merged into it. Spec.md §9 flags the original
/// implementation's count-bound merge as comparing against the
/// already-merged upper bound (`countcon_max_valid`) instead of this
/// absolute ceiling (`countcon_max`) in one branch — "treat as a likely
/// defect and test explicitly". This implementation always clamps
/// against the absolute ceiling; see DESIGN.md for the call.
pub const COUNT_MAX: u64 = 1 << 20;

/// Merge `from` into `into` in place, tightening bounds and unioning
/// predicate sets. Converges rather than widens: every bound in the
/// result is at least as tight as either input (spec.md §3 invariant:
/// "merging two clauses must converge the bounds").
pub fn merge_constraints(into: &mut Constraint, from: &Constraint) {
    if into.is_false || from.is_false {
        into.is_false = true;
        trace!(target: "graphd", "constraint merge short-circuited: branch is false");
        return;
    }

    into.timestamp = into.timestamp.merge(from.timestamp);

    let merged_count = into.count.merge(from.count);
    into.count = clamp_count_bound(merged_count);

    into.generation.extend(from.generation.iter().copied());

    merge_guid_predicates(&mut into.guid_predicates, &from.guid_predicates);
    into.string_predicates.extend(from.string_predicates.iter().cloned());

    if into.sort.is_empty() {
        into.sort = from.sort.clone();
    }

    if into.result.fields.is_empty() {
        into.result = from.result.clone();
    }

    into.pagesize = match (into.pagesize, from.pagesize) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    if from.cursor.is_some() {
        into.cursor = from.cursor.clone();
    }

    into.or_branches.extend(from.or_branches.iter().cloned());

    into.anchor = into.anchor || from.anchor;
    into.archival = into.archival && from.archival;
    into.live = into.live && from.live;

    into.mark_false_if_contradictory();
}

/// Clamp a merged count bound's upper edge to [`COUNT_MAX`]. This is the
/// corrected form of the branch spec.md §9 calls out: the comparison is
/// always against the absolute ceiling, never against whatever upper
/// bound a prior merge happened to have already converged to.
fn clamp_count_bound(mut bound: Bound<u64>) -> Bound<u64> {
    bound.hi = Some(bound.hi.map_or(COUNT_MAX, |hi| hi.min(COUNT_MAX)));
    bound
}

/// Guid predicates merge by linkage: two predicates on the same linkage
/// intersect their guid sets (both must hold), predicates on different
/// linkages accumulate independently.
fn merge_guid_predicates(into: &mut Vec<GuidPredicate>, from: &[GuidPredicate]) {
    for incoming in from {
        if let Some(existing) = into.iter_mut().find(|p| p.linkage == incoming.linkage) {
            existing.guids.retain(|g| incoming.guids.contains(g));
        } else {
            into.push(incoming.clone());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;
    use graphd_base::Timestamp;
    use graphd_model::{GuidPredicate, Guid, Linkage};

    #[test]
    fn timestamp_bounds_converge() {
        let mut a = Constraint { timestamp: Bound { lo: Some(Timestamp::from_parts(10, 0)), hi: None }, ..Default::default() };
        let b = Constraint { timestamp: Bound { lo: None, hi: Some(Timestamp::from_parts(20, 0)) }, ..Default::default() };
        merge_constraints(&mut a, &b);
        assert_eq!(a.timestamp.lo, Some(Timestamp::from_parts(10, 0)));
        assert_eq!(a.timestamp.hi, Some(Timestamp::from_parts(20, 0)));
    }

    #[test]
    fn contradiction_prunes_subtree() {
        let mut a = Constraint { count: Bound { lo: Some(100), hi: None }, ..Default::default() };
        let b = Constraint { count: Bound { lo: None, hi: Some(10) }, ..Default::default() };
        merge_constraints(&mut a, &b);
        assert!(a.is_false);
    }

    #[test]
    fn count_ceiling_is_always_the_absolute_max() {
        // Regression test for spec.md §9's open question: the ceiling
        // must be enforced regardless of what was already merged in,
        // not compared against the prior (possibly looser) upper bound.
        let mut a = Constraint { count: Bound { lo: None, hi: Some(COUNT_MAX + 500) }, ..Default::default() };
        let b = Constraint { count: Bound { lo: None, hi: Some(COUNT_MAX + 10) }, ..Default::default() };
        merge_constraints(&mut a, &b);
        assert_eq!(a.count.hi, Some(COUNT_MAX));
    }

    #[test]
    fn guid_predicates_on_same_linkage_intersect() {
        let g1 = Guid(1);
        let g2 = Guid(2);
        let g3 = Guid(3);
        let mut a = Constraint {
            guid_predicates: vec![GuidPredicate { linkage: Linkage::Left, guids: vec![g1, g2] }],
            ..Default::default()
        };
        let b = Constraint {
            guid_predicates: vec![GuidPredicate { linkage: Linkage::Left, guids: vec![g2, g3] }],
            ..Default::default()
        };
        merge_constraints(&mut a, &b);
        assert_eq!(a.guid_predicates[0].guids, vec![g2]);
    }

    #[test]
    fn false_short_circuits_merge() {
        let mut a = Constraint { is_false: true, ..Default::default() };
        let b = Constraint::default();
        merge_constraints(&mut a, &b);
        assert!(a.is_false);
    }

    #[test]
    fn archival_and_live_are_conjunctive() {
        let mut a = Constraint { archival: true, live: true, ..Default::default() };
        let b = Constraint { archival: false, live: true, ..Default::default() };
        merge_constraints(&mut a, &b);
        assert!(!a.archival);
        assert!(a.live);
    }
}
