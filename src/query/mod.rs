//! Predicate and update documents, and their in-process evaluation.

mod eval;
mod types;
mod update;

pub use eval::{compare_bson, compare_docs, eval_filter};
pub use types::{CmpOp, Filter, FindOptions, Order, SortSpec, UpdateDoc, UpdateReport};
pub use update::apply_update;
