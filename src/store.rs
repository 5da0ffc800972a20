//! Reading schema documents and writing migration files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::MigrateError;
use crate::migration::migration_filename;

/// Read a schema document.
pub fn read_schema(path: impl AsRef<Path>) -> Result<String, MigrateError> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .map_err(|e| MigrateError::from(e).context("read schema", path.display().to_string()))
}

/// Write a migration source file into `dir`, creating it if needed.
///
/// The content goes to a temporary sibling first and is renamed into place,
/// so a failed write leaves no partial migration behind.
pub fn write_migration_file(
    dir: impl AsRef<Path>,
    version: &str,
    name: &str,
    source: &str,
) -> Result<PathBuf, MigrateError> {
    let dir = dir.as_ref();
    let filename = migration_filename(version, name)?;
    let target = dir.join(&filename);
    let staging = dir.join(format!(".{filename}.tmp"));

    let write = || -> Result<(), MigrateError> {
        fs::create_dir_all(dir)?;
        fs::write(&staging, source)?;
        fs::rename(&staging, &target)?;
        Ok(())
    };

    if let Err(err) = write() {
        let _ = fs::remove_file(&staging);
        return Err(err.context("write migration", target.display().to_string()));
    }

    info!(
        event = "Store",
        phase = "WriteMigration",
        path = target.display().to_string(),
        bytes = source.len()
    );
    Ok(target)
}
