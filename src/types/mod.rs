//! Data model types for schemas, diffs and tuples.
//!
//! A [`Model`] is what the DSL parser or the live service produces. A
//! [`ModelState`] is its comparison form. A [`ModelChange`] is one difference
//! between two states.

mod change;
mod expression;
mod model;
mod state;
mod tuple;

pub use change::{ChangeKind, Confidence, ModelChange};
pub use expression::{Expression, RelationReference};
pub use model::{DEFAULT_SCHEMA_VERSION, Model, Relation, RelationMetadata, TypeDefinition};
pub use state::{ModelState, RelationState, TypeState};
pub use tuple::{Tuple, TupleFilter};
