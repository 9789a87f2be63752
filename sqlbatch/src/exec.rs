//! Script execution and result handling.
//!
//! A script is run by the [`BatchExecutor`], which yields its last result
//! either as materialized [`Row`]s or as a [`RowIterator`] over the live
//! cursor. The resources behind a streamed result are released by a
//! [`CompletionBinding`] once the consuming exchange is done.

pub mod value;
pub use value::Value;

mod row;
pub use row::*;

mod column;
pub use column::*;

mod janitor;
pub use janitor::*;

mod iter;
pub use iter::*;

mod completion;
pub use completion::*;

mod batch;
pub use batch::*;
