// The database opener is a small state machine run once at startup and
// again on every snapshot-restore retry (spec.md §4.2 "Database
// Opener"): configure the store, open it, verify it's not corrupt,
// restore from snapshot if it is, and only then start serving requests.
// `Open` can be retried in place (a transient busy condition during
// restore) without losing the machine's position.

use graphd_base::{err, kind, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenerState {
    Configure,
    Open,
    Verify,
    SnapshotRestore,
    Run,
}

#[derive(Debug)]
pub struct Opener {
    state: OpenerState,
    /// Whether a snapshot restore has already been attempted this boot.
    /// `configure_done`/`verify` both recover from a bad store by
    /// restoring once; a second restore attempt would loop, so it's
    /// refused and treated as fatal instead (spec.md §4.2 "Snapshot
    /// restore is attempted at most once per configure/initialize call
    /// to prevent loops; the second failure is fatal").
    restore_used: bool,
}

impl Opener {
    pub fn new() -> Self {
        Opener { state: OpenerState::Configure, restore_used: false }
    }

    pub fn state(&self) -> OpenerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == OpenerState::Run
    }

    pub fn configure_done(&mut self) -> Result<()> {
        self.transition(OpenerState::Configure, OpenerState::Open)
    }

    /// Route a `configure_done`/`initialize` failure per spec.md §4.2's
    /// recovery table: `EBUSY` and `SYNTAX` are immediately fatal, a
    /// stale lock gets one snapshot-restore attempt, anything else is
    /// fatal too.
    pub fn configure_failed(&mut self, cause: ErrorKind) -> Result<()> {
        self.expect(OpenerState::Configure)?;
        match cause {
            ErrorKind::StaleLock => self.begin_restore(),
            ErrorKind::Busy => Err(kind(ErrorKind::Busy, "configure_done: database busy, another process owns it")),
            ErrorKind::Syntax => {
                Err(kind(ErrorKind::Syntax, "configure_done: no database at configured path (-D set)"))
            }
            other => Err(kind(other, "configure_done: fatal")),
        }
    }

    pub fn open_succeeded(&mut self) -> Result<()> {
        self.transition(OpenerState::Open, OpenerState::Verify)
    }

    /// A transient busy condition (store mid-restore elsewhere); stays
    /// in `Open` for the caller to retry.
    pub fn open_failed_busy(&mut self) -> Result<()> {
        self.expect(OpenerState::Open)
    }

    pub fn verify_passed(&mut self) -> Result<()> {
        self.transition(OpenerState::Verify, OpenerState::Run)
    }

    pub fn verify_failed_corruption(&mut self) -> Result<()> {
        self.expect(OpenerState::Verify)?;
        self.begin_restore()
    }

    pub fn snapshot_restored(&mut self) -> Result<()> {
        self.transition(OpenerState::SnapshotRestore, OpenerState::Open)
    }

    /// Move to `SnapshotRestore`, refusing if this boot already spent
    /// its one restore attempt.
    fn begin_restore(&mut self) -> Result<()> {
        if self.restore_used {
            return Err(kind(
                ErrorKind::Corruption,
                "snapshot restore already attempted this boot; second failure is fatal",
            ));
        }
        self.restore_used = true;
        self.state = OpenerState::SnapshotRestore;
        Ok(())
    }

    fn expect(&self, want: OpenerState) -> Result<()> {
        if self.state != want {
            return Err(err(format!("opener: expected state {:?}, currently {:?}", want, self.state)));
        }
        Ok(())
    }

    fn transition(&mut self, from: OpenerState, to: OpenerState) -> Result<()> {
        self.expect(from)?;
        self.state = to;
        Ok(())
    }
}

impl Default for Opener {
    fn default() -> Self {
        Opener::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn happy_path_reaches_run() {
        let mut o = Opener::new();
        o.configure_done().unwrap();
        o.open_succeeded().unwrap();
        o.verify_passed().unwrap();
        assert!(o.is_running());
    }

    #[test]
    fn corruption_routes_through_snapshot_restore_and_back() {
        let mut o = Opener::new();
        o.configure_done().unwrap();
        o.open_succeeded().unwrap();
        o.verify_failed_corruption().unwrap();
        assert_eq!(o.state(), OpenerState::SnapshotRestore);
        o.snapshot_restored().unwrap();
        assert_eq!(o.state(), OpenerState::Open);
        o.open_succeeded().unwrap();
        o.verify_passed().unwrap();
        assert!(o.is_running());
    }

    #[test]
    fn busy_open_stays_in_open_for_retry() {
        let mut o = Opener::new();
        o.configure_done().unwrap();
        o.open_failed_busy().unwrap();
        assert_eq!(o.state(), OpenerState::Open);
    }

    #[test]
    fn out_of_order_transition_is_rejected() {
        let mut o = Opener::new();
        assert!(o.open_succeeded().is_err());
    }

    #[test]
    fn busy_configure_is_a_fatal_epitaph() {
        let mut o = Opener::new();
        let e = o.configure_failed(ErrorKind::Busy).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Busy);
        assert_eq!(o.state(), OpenerState::Configure);
    }

    #[test]
    fn syntax_configure_is_a_fatal_epitaph() {
        let mut o = Opener::new();
        let e = o.configure_failed(ErrorKind::Syntax).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn other_configure_failure_is_also_fatal() {
        let mut o = Opener::new();
        let e = o.configure_failed(ErrorKind::System).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::System);
    }

    #[test]
    fn stale_configure_triggers_one_shot_restore() {
        let mut o = Opener::new();
        o.configure_failed(ErrorKind::StaleLock).unwrap();
        assert_eq!(o.state(), OpenerState::SnapshotRestore);
    }

    #[test]
    fn second_restore_attempt_this_boot_is_fatal() {
        let mut o = Opener::new();
        o.configure_failed(ErrorKind::StaleLock).unwrap();
        o.snapshot_restored().unwrap();
        o.open_succeeded().unwrap();
        let e = o.verify_failed_corruption().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Corruption);
        // the failed restore attempt never left Verify
        assert_eq!(o.state(), OpenerState::Verify);
    }
}
