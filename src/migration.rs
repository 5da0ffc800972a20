//! Registered migrations and their application state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::error::MigrateError;
use crate::traits::{MigrationLedger, SchemaClient};

/// Forward or backward entry point of a migration.
pub type MigrationFn = fn(&mut dyn SchemaClient) -> Result<(), MigrateError>;

static MIGRATION_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{14})_([a-z0-9_]+)\.rs$").expect("migration file pattern is valid")
});

#[derive(Clone)]
pub struct Migration {
    pub version: String,
    pub name: String,
    pub up: MigrationFn,
    pub down: MigrationFn,
}

impl Migration {
    pub fn new(
        version: impl Into<String>,
        name: impl Into<String>,
        up: MigrationFn,
        down: MigrationFn,
    ) -> Self {
        Self {
            version: version.into(),
            name: name.into(),
            up,
            down,
        }
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MigrationStatus {
    pub version: String,
    pub name: String,
    pub applied: bool,
}

/// A caller-owned collection of migrations.
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

impl MigrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, migration: Migration) -> &mut Self {
        self.migrations.push(migration);
        self
    }

    /// All migrations ordered by version.
    pub fn all(&self) -> Vec<&Migration> {
        let mut sorted: Vec<&Migration> = self.migrations.iter().collect();
        sorted.sort_by(|a, b| a.version.cmp(&b.version));
        sorted
    }

    pub fn pending(
        &self,
        ledger: &mut dyn MigrationLedger,
    ) -> Result<Vec<&Migration>, MigrateError> {
        let applied = ledger.get_applied()?;
        Ok(self
            .all()
            .into_iter()
            .filter(|m| !applied.contains_key(&m.version))
            .collect())
    }

    /// Run `up` for every pending migration in version order, recording each
    /// as it succeeds. Stops at the first failure.
    pub fn apply_pending(
        &self,
        client: &mut dyn SchemaClient,
        ledger: &mut dyn MigrationLedger,
    ) -> Result<Vec<String>, MigrateError> {
        let mut applied = Vec::new();
        for migration in self.pending(ledger)? {
            (migration.up)(client)
                .map_err(|e| e.context("apply migration", migration.version.as_str()))?;
            ledger.record(&migration.version, &migration.name)?;
            info!(
                event = "Migration",
                phase = "Up",
                version = migration.version.as_str(),
                name = migration.name.as_str()
            );
            applied.push(migration.version.clone());
        }
        Ok(applied)
    }

    /// Run `down` for the most recently applied migration and drop its record.
    /// Returns the rolled-back version, or `None` when nothing is applied.
    pub fn rollback_last(
        &self,
        client: &mut dyn SchemaClient,
        ledger: &mut dyn MigrationLedger,
    ) -> Result<Option<String>, MigrateError> {
        let applied = ledger.get_applied()?;
        let Some(last) = self
            .all()
            .into_iter()
            .rev()
            .find(|m| applied.contains_key(&m.version))
        else {
            return Ok(None);
        };

        (last.down)(client).map_err(|e| e.context("roll back migration", last.version.as_str()))?;
        ledger.remove(&last.version)?;
        info!(
            event = "Migration",
            phase = "Down",
            version = last.version.as_str(),
            name = last.name.as_str()
        );
        Ok(Some(last.version.clone()))
    }

    pub fn status(
        &self,
        ledger: &mut dyn MigrationLedger,
    ) -> Result<Vec<MigrationStatus>, MigrateError> {
        let applied = ledger.get_applied()?;
        Ok(self
            .all()
            .into_iter()
            .map(|m| MigrationStatus {
                version: m.version.clone(),
                name: m.name.clone(),
                applied: applied.contains_key(&m.version),
            })
            .collect())
    }
}

/// Lower-case, map spaces and hyphens to `_`, and drop anything outside
/// `[a-z0-9_]`.
pub fn sanitize_migration_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// `<version>_<sanitized name>.rs`.
pub fn migration_filename(version: &str, name: &str) -> Result<String, MigrateError> {
    let sanitized = sanitize_migration_name(name);
    if sanitized.is_empty() {
        return Err(MigrateError::InvalidMigrationName(name.to_string()));
    }
    Ok(format!("{version}_{sanitized}.rs"))
}

/// Split a migration filename into `(version, name)`.
pub fn parse_migration_filename(filename: &str) -> Option<(String, String)> {
    let captures = MIGRATION_FILE.captures(filename)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers;
    use crate::memory::{InMemoryClient, InMemoryLedger};
    use yare::parameterized;

    fn add_folder(client: &mut dyn SchemaClient) -> Result<(), MigrateError> {
        helpers::add_type_to_model(client, "folder", &[])
    }

    fn remove_folder(client: &mut dyn SchemaClient) -> Result<(), MigrateError> {
        helpers::remove_type_from_model(client, "folder")
    }

    fn add_owner(client: &mut dyn SchemaClient) -> Result<(), MigrateError> {
        helpers::add_relation_to_type(client, "folder", "owner", "[user]")
    }

    fn remove_owner(client: &mut dyn SchemaClient) -> Result<(), MigrateError> {
        helpers::remove_relation_from_type(client, "folder", "owner")
    }

    fn fail(_: &mut dyn SchemaClient) -> Result<(), MigrateError> {
        Err(MigrateError::Client("boom".into()))
    }

    fn set() -> MigrationSet {
        let mut set = MigrationSet::new();
        set.register(Migration::new("20240201000000", "owner", add_owner, remove_owner))
            .register(Migration::new("20240101000000", "folder", add_folder, remove_folder));
        set
    }

    #[test]
    fn test_all_is_sorted_by_version() {
        let set = set();
        let versions: Vec<&str> = set.all().iter().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, vec!["20240101000000", "20240201000000"]);
    }

    #[test]
    fn test_apply_pending_then_rollback() {
        let set = set();
        let mut client = InMemoryClient::from_dsl("type user\n").unwrap();
        let mut ledger = InMemoryLedger::default();

        let applied = set.apply_pending(&mut client, &mut ledger).unwrap();
        assert_eq!(applied, vec!["20240101000000", "20240201000000"]);
        assert!(client.model().type_definition("folder").unwrap().relation("owner").is_some());
        assert!(set.pending(&mut ledger).unwrap().is_empty());
        assert!(set.apply_pending(&mut client, &mut ledger).unwrap().is_empty());

        let rolled_back = set.rollback_last(&mut client, &mut ledger).unwrap();
        assert_eq!(rolled_back.as_deref(), Some("20240201000000"));
        assert!(client.model().type_definition("folder").unwrap().relations.is_empty());

        let status = set.status(&mut ledger).unwrap();
        assert_eq!(
            status.iter().map(|s| s.applied).collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[test]
    fn test_rollback_with_nothing_applied() {
        let mut client = InMemoryClient::default();
        let mut ledger = InMemoryLedger::default();
        assert_eq!(set().rollback_last(&mut client, &mut ledger).unwrap(), None);
    }

    #[test]
    fn test_failed_migration_is_not_recorded() {
        let mut set = set();
        set.register(Migration::new("20240301000000", "broken", fail, fail));
        let mut client = InMemoryClient::from_dsl("type user\n").unwrap();
        let mut ledger = InMemoryLedger::default();

        let err = set.apply_pending(&mut client, &mut ledger).unwrap_err();
        assert!(err.to_string().starts_with("apply migration failed for '20240301000000'"));
        assert_eq!(ledger.get_applied().unwrap().len(), 2);
    }

    #[parameterized(
        simple = { "add teams", "add_teams" },
        hyphens = { "Rename-Team To Org", "rename_team_to_org" },
        symbols = { "v2: drop legacy!", "v2_drop_legacy" },
    )]
    fn test_sanitize_migration_name(input: &str, expected: &str) {
        assert_eq!(sanitize_migration_name(input), expected);
    }

    #[test]
    fn test_migration_filename() {
        assert_eq!(
            migration_filename("20240101120000", "Add Teams").unwrap(),
            "20240101120000_add_teams.rs"
        );
        assert!(matches!(
            migration_filename("20240101120000", "!!!"),
            Err(MigrateError::InvalidMigrationName(_))
        ));
    }

    #[parameterized(
        valid = { "20240101120000_add_teams.rs", Some(("20240101120000", "add_teams")) },
        short_version = { "2024010112_add_teams.rs", None },
        wrong_extension = { "20240101120000_add_teams.go", None },
        no_name = { "20240101120000_.rs", None },
    )]
    fn test_parse_migration_filename(input: &str, expected: Option<(&str, &str)>) {
        let parsed = parse_migration_filename(input);
        assert_eq!(
            parsed.as_ref().map(|(v, n)| (v.as_str(), n.as_str())),
            expected
        );
    }
}
