// Process exit codes, mirroring the BSD sysexits.h convention the
// teacher's own CLIs are used to (spec.md §6 lists these four as the
// startup state machine's terminal outcomes).

/// Command line usage error.
pub const EX_USAGE: i32 = 64;
/// An operating-system-level error (can't bind the port, can't open a
/// file).
pub const EX_OSERR: i32 = 71;
/// The database could not be opened or verified after exhausting
/// snapshot-restore retries.
pub const EX_GRAPHD_DATABASE: i32 = 100;
/// Configured as a write-through replica but no reachable write-master
/// was ever found.
pub const EX_GRAPHD_REPLICA_MASTER: i32 = 101;
