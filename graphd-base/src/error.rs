// Errors are grouped the way spec.md §7/§9 describes: protocol errors the
// requester can see and act on, control-flow outcomes that are never
// surfaced as failures (MORE, NO), storage-level conditions the startup
// state machine reacts to, and systemic conditions that are always fatal.
//
// Unlike submerge_base::Error (a single opaque newtype), callers here need
// to match on *kind* to decide whether to retry, reply, or escalate, so
// the kind is a first-class enum rather than buried in a formatted string.

use std::borrow::Cow;
use std::fmt;

use backtrace_error::DynBacktraceError;
use tracing::{error, trace};

/// Coarse classification of an error, per spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; surfaced to the requester.
    Lexical,
    /// Well-formed but disallowed.
    Syntax,
    /// No matching result / not found. Often expected, may be local.
    No,
    /// Budget exhausted. Always local, never surfaces.
    More,
    /// Stale or mis-typed cursor.
    BadCursor,
    TooManyMatches,
    TooLarge,
    TooSmall,
    /// Storage-level busy condition, handled by snapshot-restore retry.
    Busy,
    StaleLock,
    /// Fatal unless `force` is set.
    Corruption,
    /// Connection-scoped I/O failure.
    IoDrop,
    /// Anything not covered by a more specific kind above.
    System,
}

impl ErrorKind {
    /// MORE and NO are expected control flow and must never be logged as
    /// errors (spec.md §9).
    fn log_level_is_error(&self) -> bool {
        !matches!(self, ErrorKind::More | ErrorKind::No)
    }
}

pub struct Error {
    kind: ErrorKind,
    inner: DynBacktraceError,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, err: E) -> Error {
        if kind.log_level_is_error() {
            error!(target: "graphd", kind = ?kind, "{:?}", err);
        } else {
            trace!(target: "graphd", kind = ?kind, "{:?}", err);
        }
        Error { kind, inner: DynBacktraceError::from(err) }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {:?}", self.kind, self.inner)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.inner)
    }
}

impl std::error::Error for Error {}

struct SimpleErr(Cow<'static, str>);
impl fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {}

/// Build an ad hoc error of the given kind from a message.
pub fn kind(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(kind, SimpleErr(msg.into()))
}

/// Convenience for the common case of a `System` error from a message.
pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind(ErrorKind::System, msg)
}
