// A request moves through three stages (spec.md §4.1, §8 invariant 1):
// reading its input off the wire, running its evaluation, and writing
// its output back. Each stage is independently `ready` (eligible to run
// next) or `done` (already ran and will never run again), and the two
// sets are kept disjoint by construction below.

use std::ops::{BitOr, BitOrAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageSet(u8);

impl StageSet {
    pub const NONE: StageSet = StageSet(0);
    pub const INPUT: StageSet = StageSet(1 << 0);
    pub const RUN: StageSet = StageSet(1 << 1);
    pub const OUTPUT: StageSet = StageSet(1 << 2);
    pub const ALL: StageSet = StageSet(Self::INPUT.0 | Self::RUN.0 | Self::OUTPUT.0);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: StageSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: StageSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: StageSet) -> StageSet {
        StageSet(self.0 | other.0)
    }

    pub fn remove(self, other: StageSet) -> StageSet {
        StageSet(self.0 & !other.0)
    }
}

impl BitOr for StageSet {
    type Output = StageSet;
    fn bitor(self, rhs: StageSet) -> StageSet {
        self.union(rhs)
    }
}

impl BitOrAssign for StageSet {
    fn bitor_assign(&mut self, rhs: StageSet) {
        *self = self.union(rhs);
    }
}
