//! Change detection and rename inference between two model states.

mod detect;
mod rename;

pub use detect::detect_changes;
pub use rename::{infer_renames, name_similarity, relation_similarity};
