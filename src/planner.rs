//! The diff and generate pipeline.

use std::path::{Path, PathBuf};

use chrono::Local;
use itertools::Itertools;
use tracing::{debug, info};

use crate::config::{GeneratorConfig, RenameThresholds};
use crate::diff::{detect_changes, infer_renames};
use crate::error::MigrateError;
use crate::generator::{GeneratedMigration, MigrationGenerator};
use crate::parser::parse_document;
use crate::store::write_migration_file;
use crate::timers::{StageTimer, StageTimings};
use crate::traits::SchemaClient;
use crate::types::{ChangeKind, Model, ModelChange, ModelState};

/// Version stamp format for migration files, 14 digits.
const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Default)]
pub struct MigrationPlanner {
    thresholds: RenameThresholds,
    generator: MigrationGenerator,
}

impl MigrationPlanner {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            thresholds: RenameThresholds::default(),
            generator: MigrationGenerator::new(config),
        }
    }

    pub fn with_thresholds(mut self, thresholds: RenameThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &RenameThresholds {
        &self.thresholds
    }

    /// Diff two schema documents.
    pub fn diff_documents(&self, old: &str, new: &str) -> Result<Vec<ModelChange>, MigrateError> {
        let mut timings = StageTimings::default();
        let (old, new) = {
            let _timer = StageTimer::new(&mut timings.parse);
            let old = parse_document(old).map_err(|e| e.context("parse current schema", "old"))?;
            let new = parse_document(new).map_err(|e| e.context("parse desired schema", "new"))?;
            (old, new)
        };
        debug!(
            event = "Plan",
            phase = "Parse",
            old_types = old.type_definitions.len(),
            new_types = new.type_definitions.len(),
            duration_us = timings.parse.as_micros() as u64
        );
        Ok(self.diff_states_timed(
            &ModelState::from_model(&old),
            &ModelState::from_model(&new),
            timings,
        ))
    }

    pub fn diff_models(&self, old: &Model, new: &Model) -> Vec<ModelChange> {
        self.diff_states(&ModelState::from_model(old), &ModelState::from_model(new))
    }

    /// Detect changes, then pair removals with additions as renames.
    pub fn diff_states(&self, old: &ModelState, new: &ModelState) -> Vec<ModelChange> {
        self.diff_states_timed(old, new, StageTimings::default())
    }

    /// Diff the store's current schema against a desired schema document.
    pub fn diff_against_store(
        &self,
        client: &mut dyn SchemaClient,
        desired: &str,
    ) -> Result<Vec<ModelChange>, MigrateError> {
        let current = client.read_current_schema()?;
        let old = ModelState::from_live_schema(&current)
            .map_err(|e| e.context("read current schema", "store"))?;
        let new = parse_document(desired).map_err(|e| e.context("parse desired schema", "new"))?;
        Ok(self.diff_states(&old, &ModelState::from_model(&new)))
    }

    fn diff_states_timed(
        &self,
        old: &ModelState,
        new: &ModelState,
        mut timings: StageTimings,
    ) -> Vec<ModelChange> {
        let detected = {
            let _timer = StageTimer::new(&mut timings.detect);
            detect_changes(old, new)
        };
        debug!(
            event = "Plan",
            phase = "Detect",
            changes = detected.len(),
            duration_us = timings.detect.as_micros() as u64
        );

        let detected_count = detected.len();
        let changes = {
            let _timer = StageTimer::new(&mut timings.rename);
            infer_renames(detected, old, new, &self.thresholds)
        };
        let renames = changes.iter().filter(|c| c.kind.is_rename()).count();
        debug!(
            event = "Plan",
            phase = "Rename",
            renames,
            changes = changes.len(),
            duration_us = timings.rename.as_micros() as u64
        );

        info!(
            event = "Plan",
            phase = "Summary",
            detected = detected_count,
            changes = changes.len(),
            renames,
            duration_us = timings.total().as_micros() as u64
        );
        changes
    }

    /// Generate a migration stamped with the current local time.
    pub fn generate(
        &self,
        changes: &[ModelChange],
        name: &str,
    ) -> Result<GeneratedMigration, MigrateError> {
        let version = Local::now().format(VERSION_FORMAT).to_string();
        self.generate_with_version(changes, name, &version)
    }

    pub fn generate_with_version(
        &self,
        changes: &[ModelChange],
        name: &str,
        version: &str,
    ) -> Result<GeneratedMigration, MigrateError> {
        let mut timings = StageTimings::default();
        let generated = {
            let _timer = StageTimer::new(&mut timings.generate);
            self.generator.generate(changes, name, version)?
        };
        debug!(
            event = "Plan",
            phase = "Generate",
            changes = changes.len(),
            version,
            duration_us = timings.generate.as_micros() as u64
        );
        Ok(generated)
    }

    /// Generate a migration and write it into `dir`. Nothing is written when
    /// generation fails.
    pub fn write_migration(
        &self,
        dir: impl AsRef<Path>,
        name: &str,
        changes: &[ModelChange],
    ) -> Result<PathBuf, MigrateError> {
        let generated = self.generate(changes, name)?;
        write_migration_file(dir, &generated.version, &generated.name, &generated.source)
    }
}

/// A human-readable summary of `changes`, one per line, renames last.
pub fn describe_changes(changes: &[ModelChange]) -> String {
    if changes.is_empty() {
        return "No changes detected.".to_string();
    }
    let (renames, others): (Vec<&ModelChange>, Vec<&ModelChange>) =
        changes.iter().partition(|c| c.kind.is_rename());

    let mut lines = vec![format!("Detected {} change(s):", changes.len())];
    lines.extend(others.iter().map(|c| format!("  {c}")));
    if !renames.is_empty() {
        lines.push("Inferred renames:".to_string());
        lines.extend(renames.iter().map(|c| {
            let target = match c.kind {
                ChangeKind::RenameRelation => format!(
                    "{t}.{} -> {t}.{}",
                    c.old_str(),
                    c.new_str(),
                    t = c.type_name
                ),
                _ => format!("{} -> {}", c.old_str(), c.new_str()),
            };
            format!("  {} {target} [{}]", c.kind.symbol(), c.confidence())
        }));
    }
    lines.iter().join("\n")
}

/// Diff two schema documents with the default planner.
pub fn diff(old: &str, new: &str) -> Result<Vec<ModelChange>, MigrateError> {
    MigrationPlanner::default().diff_documents(old, new)
}

/// Generate a migration with the default planner.
pub fn generate(changes: &[ModelChange], name: &str) -> Result<GeneratedMigration, MigrateError> {
    MigrationPlanner::default().generate(changes, name)
}

#[cfg(test)]
mod tests;
