// The constraint is the read/write query AST described in spec.md §3. It
// is built by the (out-of-scope) parser and then folded by
// `graphd-constraint`'s clause merger into canonical bounds/flags before
// a read pipeline ever sees it.

use graphd_base::Timestamp;
use serde::{Deserialize, Serialize};

use crate::guid::Guid;
use crate::primitive::Linkage;

/// An inclusive lower/upper bound pair. `None` on either side means
/// unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bound<T> {
    pub lo: Option<T>,
    pub hi: Option<T>,
}

impl<T: PartialOrd + Copy> Bound<T> {
    pub fn unbounded() -> Self {
        Bound { lo: None, hi: None }
    }

    pub fn contains(&self, v: T) -> bool {
        self.lo.map_or(true, |lo| v >= lo) && self.hi.map_or(true, |hi| v <= hi)
    }

    /// Intersect two bounds, tightening toward whichever side is more
    /// restrictive. Never widens.
    pub fn merge(self, other: Bound<T>) -> Bound<T> {
        let lo = match (self.lo, other.lo) {
            (Some(a), Some(b)) => Some(if a > b { a } else { b }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        let hi = match (self.hi, other.hi) {
            (Some(a), Some(b)) => Some(if a < b { a } else { b }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        Bound { lo, hi }
    }

    /// A bound is contradictory (and so forces the owning constraint's
    /// `false` flag) once its lower bound exceeds its upper bound.
    pub fn is_contradictory(&self) -> bool {
        matches!((self.lo, self.hi), (Some(lo), Some(hi)) if lo > hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationBound {
    Oldest(u32),
    Newest(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidPredicate {
    pub linkage: Linkage,
    /// Candidate guids; a primitive matches if its linkage guid is one
    /// of these (an implicit OR within the same linkage).
    pub guids: Vec<Guid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringOp {
    Eq,
    Prefix,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringField {
    Name,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringPredicate {
    pub field: StringField,
    pub op: StringOp,
    pub text: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    Timestamp,
    Guid,
    Name,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortPattern {
    pub field: SortField,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultPattern {
    /// Dotted-path result fields the caller asked to see projected, e.g.
    /// "guid", "timestamp", "name". Empty means "whole primitive".
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub timestamp: Bound<Timestamp>,
    pub count: Bound<u64>,
    pub generation: Vec<GenerationBound>,
    pub dateline: Option<Vec<(u64, u64)>>,
    pub guid_predicates: Vec<GuidPredicate>,
    pub string_predicates: Vec<StringPredicate>,
    pub sort: Vec<SortPattern>,
    pub result: ResultPattern,
    pub pagesize: Option<u32>,
    pub start: u32,
    pub cursor: Option<String>,
    pub or_branches: Vec<Constraint>,

    /// Provably empty: once set, the whole subtree is pruned (spec.md §3).
    pub is_false: bool,
    pub anchor: bool,
    pub archival: bool,
    pub live: bool,
}

impl Default for Constraint {
    fn default() -> Self {
        Constraint {
            timestamp: Bound::unbounded(),
            count: Bound::unbounded(),
            generation: Vec::new(),
            dateline: None,
            guid_predicates: Vec::new(),
            string_predicates: Vec::new(),
            sort: Vec::new(),
            result: ResultPattern::default(),
            pagesize: None,
            start: 0,
            cursor: None,
            or_branches: Vec::new(),
            is_false: false,
            anchor: false,
            archival: false,
            live: true,
        }
    }
}

impl Constraint {
    /// A contradiction (bound with lo > hi, or explicit false) flips
    /// `false` to true and prunes the subtree (spec.md §3 invariant).
    pub fn mark_false_if_contradictory(&mut self) {
        if self.timestamp.is_contradictory() || self.count.is_contradictory() {
            self.is_false = true;
        }
    }
}
