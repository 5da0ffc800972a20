//! Entry point for generated migration programs.

use std::process::ExitCode;

use strum_macros::{AsRefStr, Display};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::MigrateError;
use crate::migration::MigrationFn;
use crate::traits::SchemaClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// `down` selects [`Direction::Down`]; anything else, or nothing, is up.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        match args.into_iter().nth(1).as_deref() {
            Some("down") => Direction::Down,
            _ => Direction::Up,
        }
    }
}

/// Run a migration from `main`, reading the client settings from the
/// environment.
pub fn run_main<I, F, C>(args: I, connect: F, up: MigrationFn, down: MigrationFn) -> ExitCode
where
    I: IntoIterator<Item = String>,
    F: FnOnce(&ClientConfig) -> Result<C, MigrateError>,
    C: SchemaClient,
{
    match run(args, ClientConfig::from_env(), connect, up, down) {
        Ok(direction) => {
            println!("Migration {direction} completed.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Migration failed: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Connect and run the selected direction.
pub fn run<I, F, C>(
    args: I,
    config: Result<ClientConfig, MigrateError>,
    connect: F,
    up: MigrationFn,
    down: MigrationFn,
) -> Result<Direction, MigrateError>
where
    I: IntoIterator<Item = String>,
    F: FnOnce(&ClientConfig) -> Result<C, MigrateError>,
    C: SchemaClient,
{
    let direction = Direction::from_args(args);
    let config = config?;
    let mut client = connect(&config)?;

    info!(
        event = "Runner",
        phase = "Start",
        direction = direction.as_ref(),
        api_url = config.api_url.as_str()
    );
    match direction {
        Direction::Up => up(&mut client)?,
        Direction::Down => down(&mut client)?,
    }
    info!(event = "Runner", phase = "Done", direction = direction.as_ref());
    Ok(direction)
}
