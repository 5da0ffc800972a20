// src/lib.rs
pub use config::{ClientConfig, GeneratorConfig, RenameThresholds};
pub use error::{MigrateError, ParseErrorKind};
pub use generator::{GeneratedMigration, MigrationGenerator};
pub use live_schema::AuthorizationModel;
pub use memory::{InMemoryClient, InMemoryLedger};
pub use migration::{Migration, MigrationFn, MigrationSet, MigrationStatus};
pub use parser::{parse_document, parse_expression};
pub use planner::{MigrationPlanner, describe_changes, diff, generate};
pub use traits::{AppliedInfo, MigrationLedger, SchemaClient};
pub use types::{
    ChangeKind, Confidence, Expression, Model, ModelChange, ModelState, Relation, Tuple,
    TupleFilter, TypeDefinition,
};

pub mod config;
pub mod diff;
pub mod format;
pub mod helpers;
pub mod ledger;
pub mod live_schema;
pub mod memory;
pub mod migration;
pub mod parser;
pub mod runner;
pub mod store;
pub mod timers;
pub mod types;

mod error;
mod generator;
mod planner;
mod traits;
