mod constraint;
mod dateline;
mod guid;
mod primitive;

pub use constraint::{
    Bound, Constraint, GenerationBound, GuidPredicate, ResultPattern, SortField, SortPattern,
    StringField, StringOp, StringPredicate,
};
pub use dateline::Dateline;
pub use guid::Guid;
pub use primitive::{Linkage, Primitive, ValueType};
