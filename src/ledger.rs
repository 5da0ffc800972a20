//! A migration ledger stored as marker tuples in the authorization store.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::MigrateError;
use crate::traits::{AppliedInfo, MigrationLedger, SchemaClient};
use crate::types::{Tuple, TupleFilter};

const OBJECT_TYPE: &str = "migration";
const RELATION: &str = "applied";
const USER_PREFIX: &str = "migration_name:";

/// Records each applied migration as
/// `migration:<version>#applied@migration_name:<name>`.
#[derive(Debug)]
pub struct TupleLedger<C> {
    client: C,
}

impl<C: SchemaClient> TupleLedger<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    fn marker(version: &str, name: &str) -> Tuple {
        Tuple::new(
            format!("{USER_PREFIX}{name}"),
            RELATION,
            format!("{OBJECT_TYPE}:{version}"),
        )
    }

    fn markers(&mut self) -> Result<Vec<Tuple>, MigrateError> {
        self.client
            .read_all_tuples(&TupleFilter::new(OBJECT_TYPE, RELATION))
            .map_err(|e| MigrateError::Ledger(e.to_string()))
    }
}

impl<C: SchemaClient> MigrationLedger for TupleLedger<C> {
    fn get_applied(&mut self) -> Result<BTreeMap<String, AppliedInfo>, MigrateError> {
        let applied = self
            .markers()?
            .into_iter()
            .map(|tuple| {
                let version = tuple.object_id().to_string();
                let name = tuple
                    .user
                    .strip_prefix(USER_PREFIX)
                    .unwrap_or(tuple.user.as_str())
                    .to_string();
                (version.clone(), AppliedInfo { version, name })
            })
            .collect();
        Ok(applied)
    }

    fn record(&mut self, version: &str, name: &str) -> Result<(), MigrateError> {
        debug!(event = "Ledger", phase = "Record", version, name);
        self.client
            .write_tuples(&[Self::marker(version, name)])
            .map_err(|e| MigrateError::Ledger(e.to_string()))
    }

    fn remove(&mut self, version: &str) -> Result<(), MigrateError> {
        let object = format!("{OBJECT_TYPE}:{version}");
        let stale: Vec<Tuple> = self
            .markers()?
            .into_iter()
            .filter(|t| t.object == object)
            .collect();
        debug!(event = "Ledger", phase = "Remove", version, markers = stale.len());
        if stale.is_empty() {
            return Ok(());
        }
        self.client
            .delete_tuples(&stale)
            .map_err(|e| MigrateError::Ledger(e.to_string()))
    }
}
