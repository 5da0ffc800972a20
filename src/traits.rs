use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::MigrateError;
use crate::live_schema::AuthorizationModel;
use crate::types::{Model, Tuple, TupleFilter};

/// Access to an authorization store: its current schema and its tuples.
///
/// Implementations talk to the real service; [`crate::memory::InMemoryClient`]
/// keeps everything in process.
pub trait SchemaClient {
    /// The schema as the service reports it.
    fn read_current_schema(&mut self) -> Result<AuthorizationModel, MigrateError>;

    /// Replace the store's schema with `model`.
    fn write_schema(&mut self, model: &Model) -> Result<(), MigrateError>;

    /// Every tuple matching `filter`, across all pages.
    fn read_all_tuples(&mut self, filter: &TupleFilter) -> Result<Vec<Tuple>, MigrateError>;

    fn write_tuples(&mut self, tuples: &[Tuple]) -> Result<(), MigrateError>;

    fn delete_tuples(&mut self, tuples: &[Tuple]) -> Result<(), MigrateError>;

    /// The current schema as a structured model.
    fn read_model(&mut self) -> Result<Model, MigrateError> {
        let schema = self.read_current_schema()?;
        Model::try_from(&schema).map_err(|e| e.context("read current schema", "store"))
    }
}

impl<C: SchemaClient + ?Sized> SchemaClient for Box<C> {
    fn read_current_schema(&mut self) -> Result<AuthorizationModel, MigrateError> {
        (**self).read_current_schema()
    }

    fn write_schema(&mut self, model: &Model) -> Result<(), MigrateError> {
        (**self).write_schema(model)
    }

    fn read_all_tuples(&mut self, filter: &TupleFilter) -> Result<Vec<Tuple>, MigrateError> {
        (**self).read_all_tuples(filter)
    }

    fn write_tuples(&mut self, tuples: &[Tuple]) -> Result<(), MigrateError> {
        (**self).write_tuples(tuples)
    }

    fn delete_tuples(&mut self, tuples: &[Tuple]) -> Result<(), MigrateError> {
        (**self).delete_tuples(tuples)
    }
}

/// One applied migration as the ledger records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppliedInfo {
    pub version: String,
    pub name: String,
}

/// Where applied migrations are remembered, keyed by version.
pub trait MigrationLedger {
    fn get_applied(&mut self) -> Result<BTreeMap<String, AppliedInfo>, MigrateError>;

    fn record(&mut self, version: &str, name: &str) -> Result<(), MigrateError>;

    fn remove(&mut self, version: &str) -> Result<(), MigrateError>;
}
