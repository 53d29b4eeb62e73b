// A guid is the 128-bit stable identity of a primitive (spec.md §3).
// Unlike the dense, monotonic `id`, guids survive across databases and
// replicas and are what the wire protocol and dateline exchange.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Guid(pub u128);

impl Guid {
    pub const NULL: Guid = Guid(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn from_hex(s: &str) -> Option<Guid> {
        u128::from_str_radix(s.trim_start_matches("0x"), 16).ok().map(Guid)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
