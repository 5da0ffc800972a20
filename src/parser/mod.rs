mod dsl;
mod expression;

pub use dsl::{parse_document, parse_relation};
pub use expression::{parse_direct_types, parse_expression};

pub(crate) use expression::is_identifier;
