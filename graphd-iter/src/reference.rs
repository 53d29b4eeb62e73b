// A simple in-memory, ascending-id iterator. Stands in for the tile
// store's real iterators in tests and example pipelines: this workspace
// does not implement the physical primitive store (spec.md §1
// Non-goals/explicitly-out-of-scope), but the sort and islink engines
// need *something* implementing the contract to exercise against.

use graphd_base::Budget;

use crate::{CheckOutcome, FindOutcome, NextOutcome, PrimitiveIterator, Statistics};

#[derive(Debug, Clone)]
pub struct VecIterator {
    ids: Vec<u64>,
    pos: usize,
    forward: bool,
}

impl VecIterator {
    pub fn new(mut ids: Vec<u64>, forward: bool) -> Self {
        ids.sort_unstable();
        if !forward {
            ids.reverse();
        }
        VecIterator { ids, pos: 0, forward }
    }

    const PREFIX: &'static str = "vec:";

    pub fn thaw(text: &str) -> Option<VecIterator> {
        let rest = text.strip_prefix(Self::PREFIX)?;
        let (pos_str, ids_str) = rest.split_once(';')?;
        let pos: usize = pos_str.parse().ok()?;
        let ids: Vec<u64> = if ids_str.is_empty() {
            Vec::new()
        } else {
            ids_str.split(',').map(|s| s.parse().ok()).collect::<Option<_>>()?
        };
        Some(VecIterator { ids, pos, forward: true })
    }
}

impl PrimitiveIterator for VecIterator {
    fn next(&mut self, budget: &mut Budget) -> NextOutcome {
        if budget.is_exhausted() {
            return NextOutcome::More;
        }
        budget.spend(1);
        match self.ids.get(self.pos) {
            Some(&id) => {
                self.pos += 1;
                NextOutcome::Id(id)
            }
            None => NextOutcome::None,
        }
    }

    fn find(&mut self, target: u64, budget: &mut Budget) -> FindOutcome {
        while self.pos < self.ids.len() {
            if budget.is_exhausted() {
                return FindOutcome::More;
            }
            budget.spend(1);
            let id = self.ids[self.pos];
            let reached = if self.forward { id >= target } else { id <= target };
            if reached {
                self.pos += 1;
                return FindOutcome::Id(id);
            }
            self.pos += 1;
        }
        FindOutcome::None
    }

    fn check(&mut self, id: u64, budget: &mut Budget) -> CheckOutcome {
        if budget.is_exhausted() {
            return CheckOutcome::More;
        }
        budget.spend(1);
        if self.ids.contains(&id) {
            CheckOutcome::Yes
        } else {
            CheckOutcome::No
        }
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn clone_box(&self) -> Box<dyn PrimitiveIterator> {
        Box::new(self.clone())
    }

    fn freeze(&self) -> String {
        let ids = self.ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        format!("{}{};{}", Self::PREFIX, self.pos, ids)
    }

    fn beyond(&self, value: u64) -> Option<bool> {
        if !self.forward {
            return None;
        }
        self.ids.get(self.pos).map(|&id| id > value)
    }

    fn range_estimate(&self) -> Option<(u64, u64)> {
        match (self.ids.first(), self.ids.last()) {
            (Some(&a), Some(&b)) => Some((a.min(b), a.max(b))),
            _ => None,
        }
    }

    fn statistics(&self) -> Statistics {
        Statistics {
            n: Some(self.ids.len() as u64),
            check_cost: 1,
            next_cost: 1,
            find_cost: 1,
            sorted: true,
            ordered: true,
            forward: self.forward,
        }
    }
}
