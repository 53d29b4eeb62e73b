// The islink engine accelerates "is-a"/"links-to" lookups — find every
// primitive whose `left`/`right`/`typeguid`/`scope` linkage points at a
// given endpoint — by keeping a per-(type, linkage, endpoint) idset
// (spec.md §4.5 "Islink Engine"). Endpoints with very large fan-out are
// not worth indexing: past [`INTERESTING_MAX`] entries a side is marked
// "vast" and its idset is dropped, so callers fall back to a linear scan
// for it instead of paying to maintain an index nobody benefits from.
//
// Two paths feed the index: `record` is the live path, called as each
// primitive commits; `job_run` is the background path, walking a VIP
// source (spec.md GLOSSARY "VIP iterator") over backlog the live path
// hasn't caught up on yet, the way the replication pipeline pairs an
// inline live-propagation path with a bulk catch-up path.

use std::collections::{HashMap, HashSet, VecDeque};

use graphd_base::Budget;
use graphd_model::Linkage;
use tracing::trace;

/// Below this many distinct endpoints, a (type, linkage) pair isn't
/// worth forming an intersection group for — a direct scan is as cheap.
pub const INTERESTING_MIN: usize = 2;

/// Above this many primitive ids for a single endpoint, tracking the
/// idset stops paying for itself; the side is dropped and marked vast.
pub const INTERESTING_MAX: usize = 3;

/// Above this many memoized intersection members, keep only the count:
/// an enumerated id list stops being cheaper than a linear re-scan. Set
/// below [`INTERESTING_MAX`] deliberately — an intersection can never
/// hold more members than the smaller of its two input idsets, and
/// those are themselves capped at `INTERESTING_MAX`, so this threshold
/// has to sit strictly under it to ever trigger.
pub const INTERSECTION_ENUMERATE_MAX: usize = 2;

/// Cost charged per primitive a job's VIP scan advances past. Islink
/// maintenance is a background task riding alongside heavier
/// budget-bearing work (iterate, sort), so it is charged a quarter of a
/// full primitive-processing unit (spec.md §4.5 "decrements a
/// quarter-cost per primitive").
const PRIMITIVE_COST: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub linkage: Linkage,
    pub type_id: u64,
    pub endpoint_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    More,
}

/// Stands in for the out-of-scope VIP iterator: given a
/// `(type, linkage[, endpoint])` selector, yields matching primitives in
/// increasing id order. Implementations back this with whatever the
/// (out-of-scope) tile store's VIP range actually is.
pub trait VipSource {
    /// The next `(primitive_id, endpoint_id)` pair with
    /// `primitive_id > after` matching `type_id`/`linkage` (and
    /// `endpoint_id`, if the job is endpoint-scoped), or `None` once the
    /// range is exhausted.
    fn next_vip(
        &self,
        type_id: u64,
        linkage: Linkage,
        endpoint_id: Option<u64>,
        after: u64,
    ) -> Option<(u64, u64)>;
}

/// A pending or in-progress background scan, keyed by [`JobKey`]. `low`
/// is the job's resume cursor (spec.md §4.5 "job_low cursor"), so a
/// budget-exhausted run picks back up without rescanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Job {
    key: JobKey,
    low: u64,
}

#[derive(Debug, Default)]
struct Side {
    idsets: HashMap<u64, Vec<u64>>,
    vast: HashSet<u64>,
}

impl Side {
    fn is_interesting(&self) -> bool {
        self.idsets.len() >= INTERESTING_MIN
    }
}

/// Either an enumerated idset or, once it has grown past
/// [`INTERSECTION_ENUMERATE_MAX`], just its size (spec.md §4.5 "overflow
/// of either side collapses that side to a count-only representation").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSet {
    Ids(Vec<u64>),
    Count(usize),
}

impl GroupSet {
    fn from_ids(mut ids: Vec<u64>) -> GroupSet {
        if ids.len() > INTERSECTION_ENUMERATE_MAX {
            GroupSet::Count(ids.len())
        } else {
            ids.sort_unstable();
            GroupSet::Ids(ids)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GroupSet::Ids(ids) => ids.len(),
            GroupSet::Count(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Option<&[u64]> {
        match self {
            GroupSet::Ids(ids) => Some(ids),
            GroupSet::Count(_) => None,
        }
    }
}

/// A memoized pairwise group intersection: `include` is the ids common
/// to both groups, `exclude` the ids in the first group but not the
/// second (spec.md §4.5 "the global intersect table memoizes pairwise
/// group intersections as `{include: idset|count, exclude: idset|count}`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intersection {
    pub include: GroupSet,
    pub exclude: GroupSet,
}

/// The full islink acceleration index: one [`Side`] per (type, linkage),
/// plus a memoization cache of pairwise idset intersections (spec.md
/// §4.5 "group intersection memoization") and a queue of pending
/// background scans consumed by [`IslinkEngine::job_run`].
#[derive(Debug, Default)]
pub struct IslinkEngine {
    sides: HashMap<(u64, Linkage), Side>,
    memo: HashMap<(JobKey, JobKey), Intersection>,
    pending: VecDeque<Job>,
}

impl IslinkEngine {
    pub fn new() -> Self {
        IslinkEngine::default()
    }

    /// Record that `primitive_id` carries `linkage -> endpoint_id` under
    /// `type_id`. This is the live path, called as each primitive
    /// commits; it also queues a background job for this key so
    /// [`Self::job_run`] can reconcile it against the VIP backlog.
    pub fn record(&mut self, type_id: u64, linkage: Linkage, endpoint_id: u64, primitive_id: u64) {
        self.side_add(type_id, linkage, endpoint_id, primitive_id);

        let key = JobKey { linkage, type_id, endpoint_id: Some(endpoint_id) };
        if !self.pending.iter().any(|j| j.key == key) {
            self.pending.push_back(Job { key, low: primitive_id });
        }
    }

    /// Core side-maintenance shared by the live path ([`Self::record`])
    /// and the background path ([`Self::job_run`]): add `primitive_id`
    /// to the idset for `endpoint_id`, tripping the side into `vast` if
    /// it overflows, and invalidate any memoized intersection touching
    /// this endpoint.
    fn side_add(&mut self, type_id: u64, linkage: Linkage, endpoint_id: u64, primitive_id: u64) {
        self.memo.retain(|(a, b), _| {
            !(a.type_id == type_id && a.linkage == linkage && a.endpoint_id == Some(endpoint_id))
                && !(b.type_id == type_id && b.linkage == linkage && b.endpoint_id == Some(endpoint_id))
        });

        let side = self.sides.entry((type_id, linkage)).or_default();
        if side.vast.contains(&endpoint_id) {
            return;
        }

        let ids = side.idsets.entry(endpoint_id).or_default();
        if !ids.contains(&primitive_id) {
            ids.push(primitive_id);
        }

        if ids.len() > INTERESTING_MAX {
            trace!(target: "graphd", type_id, endpoint_id, "islink: side went vast, dropping idset");
            side.idsets.remove(&endpoint_id);
            side.vast.insert(endpoint_id);
        }
    }

    pub fn is_vast(&self, type_id: u64, linkage: Linkage, endpoint_id: u64) -> bool {
        self.sides
            .get(&(type_id, linkage))
            .map(|s| s.vast.contains(&endpoint_id))
            .unwrap_or(false)
    }

    /// Primitive ids known to carry `linkage -> endpoint_id` under
    /// `type_id`, or `None` if the side isn't indexed (not yet seen, or
    /// vast — callers must fall back to scanning in that case).
    pub fn ids_for(&self, type_id: u64, linkage: Linkage, endpoint_id: u64) -> Option<&[u64]> {
        let side = self.sides.get(&(type_id, linkage))?;
        if side.vast.contains(&endpoint_id) {
            return None;
        }
        side.idsets.get(&endpoint_id).map(Vec::as_slice)
    }

    pub fn is_interesting(&self, type_id: u64, linkage: Linkage) -> bool {
        self.sides.get(&(type_id, linkage)).map(Side::is_interesting).unwrap_or(false)
    }

    /// Intersection of two endpoint idsets, memoized per key pair.
    /// Returns `None` if either side is unindexed or vast.
    pub fn intersect(&mut self, a: JobKey, b: JobKey) -> Option<&Intersection> {
        let memo_key = if (a.type_id, a.linkage, a.endpoint_id) <= (b.type_id, b.linkage, b.endpoint_id) {
            (a, b)
        } else {
            (b, a)
        };
        if !self.memo.contains_key(&memo_key) {
            let ids_a = self.ids_for(a.type_id, a.linkage, a.endpoint_id?)?;
            let ids_b = self.ids_for(b.type_id, b.linkage, b.endpoint_id?)?;
            let set_b: HashSet<u64> = ids_b.iter().copied().collect();
            let (include, exclude): (Vec<u64>, Vec<u64>) =
                ids_a.iter().copied().partition(|id| set_b.contains(id));
            self.memo.insert(
                memo_key,
                Intersection { include: GroupSet::from_ids(include), exclude: GroupSet::from_ids(exclude) },
            );
        }
        self.memo.get(&memo_key)
    }

    /// Process one background scan under `budget`, either the named
    /// `key` (creating it fresh if not already pending) or the head of
    /// the pending queue (spec.md §4.5 `job_run(key|NULL)`). Reads
    /// primitives from `source` in id order, spending [`PRIMITIVE_COST`]
    /// per primitive and folding each into the relevant side via
    /// [`Self::side_add`]. Completes when `source` is exhausted for this
    /// key, or — for an endpoint-scoped job — once both the LEFT and
    /// RIGHT sides for that endpoint have gone vast.
    pub fn job_run(&mut self, key: Option<JobKey>, source: &dyn VipSource, budget: &mut Budget) -> JobOutcome {
        let mut job = match key {
            Some(k) => {
                if let Some(pos) = self.pending.iter().position(|j| j.key == k) {
                    self.pending.remove(pos).unwrap()
                } else {
                    Job { key: k, low: 0 }
                }
            }
            None => match self.pending.pop_front() {
                Some(j) => j,
                None => return JobOutcome::Done,
            },
        };

        loop {
            if budget.is_exhausted() {
                self.pending.push_back(job);
                return JobOutcome::More;
            }
            if let Some(endpoint_id) = job.key.endpoint_id {
                if self.is_vast(job.key.type_id, Linkage::Left, endpoint_id)
                    && self.is_vast(job.key.type_id, Linkage::Right, endpoint_id)
                {
                    return JobOutcome::Done;
                }
            }
            match source.next_vip(job.key.type_id, job.key.linkage, job.key.endpoint_id, job.low) {
                None => return JobOutcome::Done,
                Some((primitive_id, endpoint_id)) => {
                    budget.spend(PRIMITIVE_COST);
                    self.side_add(job.key.type_id, job.key.linkage, endpoint_id, primitive_id);
                    job.low = primitive_id;
                }
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn small_idsets_are_tracked() {
        let mut e = IslinkEngine::new();
        e.record(1, Linkage::Left, 100, 1);
        e.record(1, Linkage::Left, 100, 2);
        assert_eq!(e.ids_for(1, Linkage::Left, 100), Some(&[1, 2][..]));
        assert!(!e.is_vast(1, Linkage::Left, 100));
    }

    #[test]
    fn scenario_vast_transition_at_interesting_max() {
        let mut e = IslinkEngine::new();
        for primitive_id in 1..=INTERESTING_MAX as u64 {
            e.record(7, Linkage::Right, 42, primitive_id);
            assert!(!e.is_vast(7, Linkage::Right, 42));
        }
        // The (INTERESTING_MAX + 1)-th distinct id tips the side over.
        e.record(7, Linkage::Right, 42, INTERESTING_MAX as u64 + 1);
        assert!(e.is_vast(7, Linkage::Right, 42));
        assert_eq!(e.ids_for(7, Linkage::Right, 42), None);
    }

    #[test]
    fn group_becomes_interesting_at_min_distinct_endpoints() {
        let mut e = IslinkEngine::new();
        assert!(!e.is_interesting(3, Linkage::Left));
        e.record(3, Linkage::Left, 1, 10);
        assert!(!e.is_interesting(3, Linkage::Left));
        e.record(3, Linkage::Left, 2, 11);
        assert!(e.is_interesting(3, Linkage::Left));
    }

    #[test]
    fn intersection_is_memoized_and_correct() {
        let mut e = IslinkEngine::new();
        e.record(1, Linkage::Left, 100, 1);
        e.record(1, Linkage::Left, 100, 2);
        e.record(1, Linkage::Left, 100, 3);
        e.record(1, Linkage::Right, 200, 2);
        e.record(1, Linkage::Right, 200, 3);
        e.record(1, Linkage::Right, 200, 4);

        let a = JobKey { linkage: Linkage::Left, type_id: 1, endpoint_id: Some(100) };
        let b = JobKey { linkage: Linkage::Right, type_id: 1, endpoint_id: Some(200) };
        let first = e.intersect(a, b).cloned();
        assert_eq!(first.as_ref().and_then(|i| i.include.ids()), Some(&[2, 3][..]));
        assert_eq!(first.as_ref().and_then(|i| i.exclude.ids()), Some(&[1][..]));
        // Second call hits the memo and returns the same answer.
        assert_eq!(e.intersect(a, b).cloned(), first);
    }

    #[test]
    fn large_intersection_collapses_to_count_only() {
        let mut e = IslinkEngine::new();
        // Exactly INTERESTING_MAX ids on each side so neither goes vast,
        // but their full-overlap intersection still exceeds
        // INTERSECTION_ENUMERATE_MAX.
        for id in 0..INTERESTING_MAX as u64 {
            e.record(9, Linkage::Left, 500, id);
            e.record(9, Linkage::Right, 600, id);
        }
        let a = JobKey { linkage: Linkage::Left, type_id: 9, endpoint_id: Some(500) };
        let b = JobKey { linkage: Linkage::Right, type_id: 9, endpoint_id: Some(600) };
        let i = e.intersect(a, b).unwrap();
        assert_eq!(i.include, GroupSet::Count(INTERESTING_MAX));
        assert_eq!(i.exclude, GroupSet::Ids(vec![]));
    }

    #[test]
    fn recording_invalidates_stale_memo_entries() {
        let mut e = IslinkEngine::new();
        e.record(1, Linkage::Left, 100, 1);
        e.record(1, Linkage::Right, 200, 1);
        let a = JobKey { linkage: Linkage::Left, type_id: 1, endpoint_id: Some(100) };
        let b = JobKey { linkage: Linkage::Right, type_id: 1, endpoint_id: Some(200) };
        assert_eq!(e.intersect(a, b).and_then(|i| i.include.ids()), Some(&[1][..]));
        e.record(1, Linkage::Right, 200, 2);
        assert_eq!(e.ids_for(1, Linkage::Right, 200), Some(&[1, 2][..]));
    }

    struct VecVip(Vec<(u64, Linkage, u64, u64)>);

    impl VipSource for VecVip {
        fn next_vip(
            &self,
            type_id: u64,
            linkage: Linkage,
            endpoint_id: Option<u64>,
            after: u64,
        ) -> Option<(u64, u64)> {
            self.0
                .iter()
                .filter(|(t, l, e, p)| {
                    *t == type_id && *l == linkage && *p > after && endpoint_id.map_or(true, |want| *e == want)
                })
                .min_by_key(|(.., p)| *p)
                .map(|(_, _, e, p)| (*p, *e))
        }
    }

    #[test]
    fn job_run_scans_vip_source_in_order() {
        let mut e = IslinkEngine::new();
        let source = VecVip(vec![
            (1, Linkage::Left, 10, 1),
            (1, Linkage::Left, 10, 2),
            (1, Linkage::Left, 11, 3),
        ]);
        let key = JobKey { linkage: Linkage::Left, type_id: 1, endpoint_id: None };
        let mut b = Budget::new(1000);
        assert_eq!(e.job_run(Some(key), &source, &mut b), JobOutcome::Done);
        assert_eq!(e.ids_for(1, Linkage::Left, 10), Some(&[1, 2][..]));
        assert_eq!(e.ids_for(1, Linkage::Left, 11), Some(&[3][..]));
        assert_eq!(b.remaining(), 997);
    }

    #[test]
    fn job_run_resumes_from_cursor_after_budget_exhaustion() {
        let mut e = IslinkEngine::new();
        let source = VecVip(vec![(1, Linkage::Left, 10, 1), (1, Linkage::Left, 10, 2), (1, Linkage::Left, 10, 3)]);
        let key = JobKey { linkage: Linkage::Left, type_id: 1, endpoint_id: Some(10) };
        let mut b = Budget::new(1);
        assert_eq!(e.job_run(Some(key), &source, &mut b), JobOutcome::More);
        assert_eq!(e.ids_for(1, Linkage::Left, 10), Some(&[1][..]));

        let mut b = Budget::new(1000);
        assert_eq!(e.job_run(Some(key), &source, &mut b), JobOutcome::Done);
        assert_eq!(e.ids_for(1, Linkage::Left, 10), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn job_run_on_empty_pending_queue_is_done() {
        let mut e = IslinkEngine::new();
        let source = VecVip(vec![]);
        let mut b = Budget::new(10);
        assert_eq!(e.job_run(None, &source, &mut b), JobOutcome::Done);
    }

    #[test]
    fn record_queues_a_job_for_job_run_to_drain() {
        let mut e = IslinkEngine::new();
        e.record(1, Linkage::Left, 1, 1);
        e.record(1, Linkage::Left, 2, 2);
        assert_eq!(e.pending_len(), 2);
        let source = VecVip(vec![]);
        let mut b = Budget::new(10);
        assert_eq!(e.job_run(None, &source, &mut b), JobOutcome::Done);
        assert_eq!(e.pending_len(), 1);
    }
}
