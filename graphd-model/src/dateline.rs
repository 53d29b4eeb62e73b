// A dateline is a compact record of (database-id -> highest-primitive-id
// known) pairs, used for cross-replica consistency checks (spec.md
// GLOSSARY).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dateline(BTreeMap<u64, u64>);

impl Dateline {
    pub fn new() -> Self {
        Dateline(BTreeMap::new())
    }

    /// Record that `database_id` is known to have primitives up to
    /// `highest_id`. Never regresses a database's entry, since a dateline
    /// only ever accumulates what's been observed.
    pub fn observe(&mut self, database_id: u64, highest_id: u64) {
        let entry = self.0.entry(database_id).or_insert(0);
        if highest_id > *entry {
            *entry = highest_id;
        }
    }

    pub fn highest_known(&self, database_id: u64) -> Option<u64> {
        self.0.get(&database_id).copied()
    }

    /// Merge another dateline in, keeping the max per database (a
    /// dateline is a join-semilattice over per-database watermarks).
    pub fn merge(&mut self, other: &Dateline) {
        for (&db, &id) in other.0.iter() {
            self.observe(db, id);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn observe_never_regresses() {
        let mut d = Dateline::new();
        d.observe(1, 100);
        d.observe(1, 50);
        assert_eq!(d.highest_known(1), Some(100));
        d.observe(1, 150);
        assert_eq!(d.highest_known(1), Some(150));
    }

    #[test]
    fn merge_takes_max_per_database() {
        let mut a = Dateline::new();
        a.observe(1, 10);
        a.observe(2, 20);
        let mut b = Dateline::new();
        b.observe(1, 30);
        b.observe(3, 5);
        a.merge(&b);
        assert_eq!(a.highest_known(1), Some(30));
        assert_eq!(a.highest_known(2), Some(20));
        assert_eq!(a.highest_known(3), Some(5));
    }
}
