// The sort engine turns an unordered stream of candidate results into a
// top-K page without ever materializing more than two pages of state
// (spec.md §4.4 "Sort Engine"). It runs in two phases: seeding (collect
// the first 2P candidates, then split them into a kept page and a scratch
// page) and looping (cheaply prefilter each further candidate against the
// current median before paying for a full comparison).
//
// The generic `K` here stands in for the primitive's full sort key under
// the active sort pattern (spec.md's `SortPattern` list collapsed into a
// single composite ordering) — see DESIGN.md for why a single `Ord` key
// is equivalent to the original's per-field comparison grid for the
// single-branch case this crate is exercised against.

use graphd_base::Budget;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefilterOutcome {
    /// Strictly worse than the current median: can be rejected without a
    /// full comparison.
    TooLarge,
    /// Known to beat the median from the partial key alone.
    KnownSmaller,
    /// Not enough of the key is known yet; needs a full compare later.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Accepted,
    AcceptedTentative(u64),
    Rejected,
    More,
}

#[derive(Debug, Clone)]
struct Slot<T, K> {
    key: K,
    payload: T,
    seq: u64,
}

/// Two-page incremental top-K sort (spec.md §4.4). `pagesize` is the
/// requested page size `P`; the engine never holds more than `2P` live
/// candidates at once.
#[derive(Debug)]
pub struct SortEngine<T, K, F>
where
    K: Ord + Clone,
    F: Fn(&T) -> K,
{
    pagesize: usize,
    key_of: F,
    kept: Vec<Slot<T, K>>,
    scratch: Vec<Slot<T, K>>,
    pending: Vec<(u64, T)>,
    have_median: bool,
    have_trailing: bool,
    ended: bool,
    next_seq: u64,
    next_pending_id: u64,
    seen: u64,
    cutoff: Option<K>,
}

impl<T, K, F> SortEngine<T, K, F>
where
    T: Clone,
    K: Ord + Clone + std::fmt::Display + std::str::FromStr,
    F: Fn(&T) -> K,
{
    pub fn new(pagesize: usize, key_of: F) -> Self {
        SortEngine {
            pagesize: pagesize.max(1),
            key_of,
            kept: Vec::new(),
            scratch: Vec::new(),
            pending: Vec::new(),
            have_median: false,
            have_trailing: false,
            ended: false,
            next_seq: 0,
            next_pending_id: 0,
            seen: 0,
            cutoff: None,
        }
    }

    /// Rehydrate from a cursor previously produced by [`Self::freeze_cursor`].
    /// `prefix` disambiguates cursors across distinct sort contexts the way
    /// a real cursor would carry the originating command's identity.
    pub fn with_cursor(pagesize: usize, key_of: F, prefix: &str, cursor: &str) -> graphd_base::Result<Self> {
        let mut engine = Self::new(pagesize, key_of);
        let body = cursor
            .strip_prefix("sort:")
            .and_then(|rest| rest.strip_prefix(prefix))
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| graphd_base::kind(graphd_base::ErrorKind::BadCursor, "malformed sort cursor"))?;
        let key: K = body
            .parse()
            .map_err(|_| graphd_base::kind(graphd_base::ErrorKind::BadCursor, "unparseable sort cursor key"))?;
        engine.cutoff = Some(key);
        Ok(engine)
    }

    pub fn have_trailing(&self) -> bool {
        self.have_trailing
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn mark_ended(&mut self) {
        self.ended = true;
    }

    fn median(&self) -> Option<&K> {
        self.kept.last().map(|s| &s.key)
    }

    /// Cheap comparison of a partial key against the current median,
    /// without paying for a full record compare (spec.md §4.4 prefilter).
    pub fn prefilter(&self, partial_key: Option<&K>) -> PrefilterOutcome {
        match (self.have_median, partial_key) {
            (false, _) => PrefilterOutcome::KnownSmaller,
            (true, None) => PrefilterOutcome::Unknown,
            (true, Some(k)) => {
                if k > self.median().expect("have_median implies a kept median slot") {
                    PrefilterOutcome::TooLarge
                } else {
                    PrefilterOutcome::KnownSmaller
                }
            }
        }
    }

    /// Offer one candidate. `partial_key` is `None` when the sort key
    /// can't be computed cheaply yet (spec.md's "unknown" prefilter
    /// outcome); resolve it later with [`Self::resolve_tentative`].
    pub fn offer(&mut self, partial_key: Option<K>, payload: T, budget: &mut Budget) -> OfferOutcome {
        if budget.is_exhausted() {
            return OfferOutcome::More;
        }
        budget.spend(1);

        if let (Some(cutoff), Some(k)) = (&self.cutoff, &partial_key) {
            if k <= cutoff {
                return OfferOutcome::Rejected;
            }
        }

        self.seen += 1;
        if self.seen > self.pagesize as u64 {
            self.have_trailing = true;
        }

        match self.prefilter(partial_key.as_ref()) {
            PrefilterOutcome::TooLarge => OfferOutcome::Rejected,
            PrefilterOutcome::Unknown => {
                let id = self.next_pending_id;
                self.next_pending_id += 1;
                self.pending.push((id, payload));
                OfferOutcome::AcceptedTentative(id)
            }
            PrefilterOutcome::KnownSmaller => {
                let key = partial_key.expect("KnownSmaller only returned with a known key");
                self.insert(key, payload);
                OfferOutcome::Accepted
            }
        }
    }

    /// Resolve a candidate previously accepted tentatively via
    /// [`OfferOutcome::AcceptedTentative`], now that its full key is known.
    pub fn resolve_tentative(&mut self, id: u64, key: K) -> bool {
        let Some(pos) = self.pending.iter().position(|(pid, _)| *pid == id) else {
            return false;
        };
        let (_, payload) = self.pending.remove(pos);
        if self.have_median && key > *self.median().expect("have_median implies a kept median slot") {
            trace!(target: "graphd", "sort: tentative candidate rejected on full compare");
            return false;
        }
        self.insert(key, payload);
        true
    }

    fn insert(&mut self, key: K, payload: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let slot = Slot { key, payload, seq };
        if !self.have_median {
            self.kept.push(slot);
            if self.kept.len() == 2 * self.pagesize {
                self.promote_seed();
            }
        } else {
            self.scratch.push(slot);
            if self.scratch.len() == self.pagesize {
                self.merge_sweep();
            }
        }
    }

    fn promote_seed(&mut self) {
        self.kept.sort_by(|a, b| (&a.key, a.seq).cmp(&(&b.key, b.seq)));
        self.scratch = self.kept.split_off(self.pagesize);
        self.have_median = true;
        trace!(target: "graphd", pagesize = self.pagesize, "sort: seed page filled, median established");
    }

    fn merge_sweep(&mut self) {
        self.scratch.sort_by(|a, b| (&a.key, a.seq).cmp(&(&b.key, b.seq)));
        let mut merged = Vec::with_capacity(self.kept.len() + self.scratch.len());
        merged.append(&mut self.kept);
        merged.append(&mut self.scratch);
        merged.sort_by(|a, b| (&a.key, a.seq).cmp(&(&b.key, b.seq)));
        merged.truncate(self.pagesize);
        self.kept = merged;
        trace!(target: "graphd", "sort: merge-swept scratch page into kept page");
    }

    /// Drain the engine, returning the top page in sorted order.
    pub fn finish(mut self) -> Vec<T> {
        if !self.scratch.is_empty() {
            let mut merged = Vec::with_capacity(self.kept.len() + self.scratch.len());
            merged.append(&mut self.kept);
            merged.append(&mut self.scratch);
            merged.sort_by(|a, b| (&a.key, a.seq).cmp(&(&b.key, b.seq)));
            self.kept = merged;
        } else {
            self.kept.sort_by(|a, b| (&a.key, a.seq).cmp(&(&b.key, b.seq)));
        }
        self.kept.truncate(self.pagesize);
        self.kept.into_iter().map(|s| s.payload).collect()
    }

    /// Serialize the current median so a later run can resume past it.
    pub fn freeze_cursor(&self, prefix: &str) -> Option<String> {
        self.median().map(|k| format!("sort:{prefix}:{k}"))
    }
}
