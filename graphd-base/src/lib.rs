mod bisect;
mod budget;
mod error;
mod id;
mod timestamp;

pub use bisect::{timestamp_to_id, Op, TimestampOrdered};
pub use budget::Budget;
pub use error::{err, kind, Error, ErrorKind, Result};
pub use id::{next_unique_id, Id, IdSequence};
pub use timestamp::{Timestamp, TimestampClock, SERIAL_MAX};
