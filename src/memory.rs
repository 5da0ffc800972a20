//! In-process store and ledger, for tests and dry runs.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::MigrateError;
use crate::live_schema::AuthorizationModel;
use crate::parser::parse_document;
use crate::traits::{AppliedInfo, MigrationLedger, SchemaClient};
use crate::types::{Model, Tuple, TupleFilter};

/// A [`SchemaClient`] over a model and a tuple list held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClient {
    model: Model,
    tuples: Vec<Tuple>,
    write_calls: usize,
    delete_calls: usize,
}

impl InMemoryClient {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            ..Default::default()
        }
    }

    /// Start from a schema document.
    pub fn from_dsl(dsl: &str) -> Result<Self, MigrateError> {
        Ok(Self::new(parse_document(dsl)?))
    }

    pub fn with_tuples(mut self, tuples: impl IntoIterator<Item = Tuple>) -> Self {
        for tuple in tuples {
            if !self.tuples.contains(&tuple) {
                self.tuples.push(tuple);
            }
        }
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    /// Number of `write_tuples` calls made so far.
    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    /// Number of `delete_tuples` calls made so far.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls
    }
}

impl SchemaClient for InMemoryClient {
    fn read_current_schema(&mut self) -> Result<AuthorizationModel, MigrateError> {
        Ok(AuthorizationModel::from(&self.model))
    }

    fn write_schema(&mut self, model: &Model) -> Result<(), MigrateError> {
        debug!(
            event = "InMemoryClient",
            phase = "WriteSchema",
            types = model.type_definitions.len()
        );
        self.model = model.clone();
        Ok(())
    }

    fn read_all_tuples(&mut self, filter: &TupleFilter) -> Result<Vec<Tuple>, MigrateError> {
        Ok(self
            .tuples
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    fn write_tuples(&mut self, tuples: &[Tuple]) -> Result<(), MigrateError> {
        self.write_calls += 1;
        for tuple in tuples {
            if !self.tuples.contains(tuple) {
                self.tuples.push(tuple.clone());
            }
        }
        Ok(())
    }

    fn delete_tuples(&mut self, tuples: &[Tuple]) -> Result<(), MigrateError> {
        self.delete_calls += 1;
        self.tuples.retain(|t| !tuples.contains(t));
        Ok(())
    }
}

/// A [`MigrationLedger`] kept in a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    applied: BTreeMap<String, AppliedInfo>,
}

impl MigrationLedger for InMemoryLedger {
    fn get_applied(&mut self) -> Result<BTreeMap<String, AppliedInfo>, MigrateError> {
        Ok(self.applied.clone())
    }

    fn record(&mut self, version: &str, name: &str) -> Result<(), MigrateError> {
        self.applied.insert(
            version.to_string(),
            AppliedInfo {
                version: version.to_string(),
                name: name.to_string(),
            },
        );
        Ok(())
    }

    fn remove(&mut self, version: &str) -> Result<(), MigrateError> {
        self.applied.remove(version);
        Ok(())
    }
}
