//! Filter trees for livestate queries.
//!
//! A query hands this crate an already-built predicate over the columns of a
//! [`Schema`]. The predicate can be evaluated row by row with
//! [`FilterNode::accepts`], or, when it only constrains a single enum/flag
//! column, collapsed into one [`Bitmask`] membership test by
//! [`FilterNode::optimize_bitmask`]. [`CompiledFilter`] picks between the two.

pub mod bitmask;
pub mod compiled;
pub mod error;
pub mod filter;
pub mod operator;
pub mod schema;
pub mod value;

pub use bitmask::Bitmask;
pub use compiled::CompiledFilter;
pub use error::{FilterError, Result};
pub use filter::{FilterNode, Leaf};
pub use operator::Operator;
pub use schema::{ColumnDef, ColumnId, ColumnKind, EnumDomain, Row, Schema};
pub use value::Value;
