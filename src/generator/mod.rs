//! Turns a change list into a standalone Rust migration program.
//!
//! The program exposes `up` and `down` over a `&mut dyn SchemaClient` and a
//! `main` that picks one of them from its first argument.

mod ordering;
mod templates;

use std::fmt::Write;

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::config::GeneratorConfig;
use crate::error::MigrateError;
use crate::migration::{migration_filename, sanitize_migration_name};
use crate::types::ModelChange;

use ordering::order_forward;
use templates::BodyWriter;

/// Output of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GeneratedMigration {
    pub version: String,
    /// Sanitized migration name.
    pub name: String,
    /// Source of the `up` function.
    pub up: String,
    /// Source of the `down` function.
    pub down: String,
    /// The complete program.
    pub source: String,
}

impl GeneratedMigration {
    pub fn filename(&self) -> String {
        format!("{}_{}.rs", self.version, self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MigrationGenerator {
    config: GeneratorConfig,
}

impl MigrationGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate(
        &self,
        changes: &[ModelChange],
        name: &str,
        version: &str,
    ) -> Result<GeneratedMigration, MigrateError> {
        if changes.is_empty() {
            return Err(MigrateError::NoChanges);
        }
        migration_filename(version, name)?;
        let name = sanitize_migration_name(name);

        let ordered = order_forward(changes);

        let mut forward = BodyWriter::new();
        summary(&mut forward, changes);
        if !ordered.cycle.is_empty() {
            forward.comment(&format!(
                "NOTE: dependency cycle among added relations: {}.\n\
                 They are added in declaration order; check that each definition\n\
                 only refers to relations that exist when it is written.",
                ordered.cycle.iter().join(", ")
            ));
            forward.blank();
        }
        for change in &ordered.changes {
            forward.forward(change);
        }

        let mut backward = BodyWriter::new();
        summary(&mut backward, changes);
        for change in ordered.changes.iter().rev() {
            backward.backward(change);
        }
        let unused_client = backward.calls() == 0;

        let up = function("up", "Apply this migration.", forward.finish(), false);
        let down = function(
            "down",
            "Undo this migration where the changes allow it.",
            backward.finish(),
            unused_client,
        );
        let source = self.program(&name, version, &up, &down);

        debug!(
            event = "Generate",
            phase = "Render",
            name = name.as_str(),
            version,
            changes = changes.len(),
            bytes = source.len()
        );

        Ok(GeneratedMigration {
            version: version.to_string(),
            name,
            up,
            down,
            source,
        })
    }

    fn program(&self, name: &str, version: &str, up: &str, down: &str) -> String {
        let krate = &self.config.crate_path;
        let mut out = String::new();
        let _ = writeln!(out, "//! Migration: {name}");
        let _ = writeln!(out, "//! Version: {version}");
        let _ = writeln!(out, "//!");
        let _ = writeln!(
            out,
            "//! Generated from a schema diff. Review every step before applying."
        );
        out.push('\n');
        let _ = writeln!(out, "use {krate}::{{helpers, MigrateError, SchemaClient}};");
        out.push('\n');
        let _ = writeln!(out, "#[allow(dead_code)]");
        let _ = writeln!(out, "const BATCH_SIZE: usize = {};", self.config.batch_size);
        out.push('\n');
        let _ = writeln!(out, "fn main() -> std::process::ExitCode {{");
        let _ = writeln!(
            out,
            "    {krate}::runner::run_main(std::env::args(), {}, up, down)",
            self.config.client_factory
        );
        let _ = writeln!(out, "}}");
        out.push('\n');
        out.push_str(up);
        out.push('\n');
        out.push_str(down);
        out
    }
}

fn summary(writer: &mut BodyWriter, changes: &[ModelChange]) {
    writer.comment("Changes detected:");
    for change in changes {
        writer.comment(&format!("- {change}"));
    }
    writer.blank();
}

fn function(name: &str, doc: &str, body: String, unused_client: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "/// {doc}");
    let _ = writeln!(
        out,
        "pub fn {name}(client: &mut dyn SchemaClient) -> Result<(), MigrateError> {{"
    );
    out.push_str(&body);
    if unused_client {
        out.push_str("    let _ = client;\n");
    }
    out.push_str("    Ok(())\n}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;

    const VERSION: &str = "20240101120000";

    fn generate(changes: &[ModelChange]) -> GeneratedMigration {
        MigrationGenerator::default()
            .generate(changes, "Test Migration", VERSION)
            .unwrap()
    }

    #[test]
    fn test_empty_changes_is_no_changes() {
        let err = MigrationGenerator::default()
            .generate(&[], "noop", VERSION)
            .unwrap_err();
        assert!(matches!(err, MigrateError::NoChanges));
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let changes = vec![ModelChange::remove_type("legacy")];
        let err = MigrationGenerator::default()
            .generate(&changes, "!!!", VERSION)
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidMigrationName(_)));
    }

    #[test]
    fn test_forward_blocks_follow_kind_order() {
        let changes = vec![
            ModelChange::remove_type("legacy"),
            ModelChange::add_relation("doc", "viewer", "[user]".into()),
            ModelChange::add_type("folder", 1),
        ];
        let generated = generate(&changes);
        let up = &generated.up;
        let add_type = up.find("helpers::add_type_to_model(client, \"folder\"").unwrap();
        let add_relation = up.find("helpers::add_relation_to_type(client, \"doc\"").unwrap();
        let remove_type = up.find("helpers::remove_type_from_model(client, \"legacy\")").unwrap();
        assert!(add_type < add_relation);
        assert!(add_relation < remove_type);
    }

    #[test]
    fn test_down_reverses_and_inverts() {
        let changes = vec![
            ModelChange::add_type("folder", 0),
            ModelChange::add_relation("doc", "viewer", "[user]".into()),
        ];
        let generated = generate(&changes);
        let down = &generated.down;
        let remove_relation = down
            .find("helpers::remove_relation_from_type(client, \"doc\", \"viewer\")")
            .unwrap();
        let remove_type = down
            .find("helpers::remove_type_from_model(client, \"folder\")")
            .unwrap();
        assert!(remove_relation < remove_type);
        assert!(!down.contains("let _ = client;"));
    }

    #[test]
    fn test_down_without_calls_uses_client() {
        let changes = vec![ModelChange::remove_type("legacy")];
        let generated = generate(&changes);
        assert!(generated.down.contains("Cannot automatically restore removed type 'legacy'"));
        assert!(generated.down.contains("    let _ = client;\n    Ok(())\n}\n"));
    }

    #[test]
    fn test_program_shape() {
        let changes = vec![ModelChange::rename_type(
            "team",
            "teams",
            Confidence::High,
            "Type renamed".into(),
        )];
        let generated = MigrationGenerator::new(
            GeneratorConfig::default()
                .with_crate_path("migrate")
                .with_client_factory("my_store::connect")
                .with_batch_size(25),
        )
        .generate(&changes, "Rename Team", VERSION)
        .unwrap();

        assert_eq!(generated.name, "rename_team");
        assert_eq!(generated.filename(), "20240101120000_rename_team.rs");

        let source = &generated.source;
        assert!(source.starts_with("//! Migration: rename_team\n//! Version: 20240101120000\n"));
        assert!(source.contains("use migrate::{helpers, MigrateError, SchemaClient};"));
        assert!(source.contains("const BATCH_SIZE: usize = 25;"));
        assert!(source.contains(
            "migrate::runner::run_main(std::env::args(), my_store::connect, up, down)"
        ));
        assert!(source.contains(&generated.up));
        assert!(source.contains(&generated.down));
        assert!(generated.up.contains("    // - → Type renamed\n"));
        assert!(generated.down.contains("helpers::rename_type(client, \"teams\", \"team\")?;"));
    }

    #[test]
    fn test_cycle_is_noted_in_source() {
        let changes = vec![
            ModelChange::add_relation("doc", "a", "b".into()),
            ModelChange::add_relation("doc", "b", "a".into()),
        ];
        let generated = generate(&changes);
        assert!(
            generated
                .up
                .contains("// NOTE: dependency cycle among added relations: doc.a, doc.b.")
        );
    }

    #[test]
    fn test_definitions_are_escaped() {
        let changes = vec![ModelChange::update_relation(
            "doc",
            "viewer",
            "[user]".into(),
            "[user] or owner".into(),
        )];
        let generated = generate(&changes);
        assert!(generated.up.contains(
            "helpers::update_relation_definition(client, \"doc\", \"viewer\", \"[user] or owner\")?;"
        ));
        assert!(generated.down.contains(
            "helpers::update_relation_definition(client, \"doc\", \"viewer\", \"[user]\")?;"
        ));
    }
}
