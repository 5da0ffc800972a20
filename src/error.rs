use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// The specific way a schema document or relation expression failed to parse.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum ParseErrorKind {
    RelationOutsideType,
    InvalidRelationDefinition,
    InvalidDifferenceSyntax,
    InvalidTupleToUsersetFormat,
    UnparseableExpression,
    InvalidTypeRelationReference,
}

#[derive(Debug, Error, Serialize, Deserialize)]
pub enum MigrateError {
    #[error("{kind}{}: {fragment}", line_suffix(.line))]
    Parse {
        kind: ParseErrorKind,
        fragment: String,
        line: Option<usize>,
    },

    #[error("no changes detected, nothing to generate")]
    NoChanges,

    #[error(
        "authorization service unavailable: {0} (make sure the service is running and reachable)"
    )]
    ServiceUnavailable(String),

    #[error("client error: {0}")]
    Client(String),

    #[error("type '{0}' not found")]
    TypeNotFound(String),

    #[error("type '{0}' already exists")]
    TypeExists(String),

    #[error("relation '{relation}' not found on type '{type_name}'")]
    RelationNotFound { type_name: String, relation: String },

    #[error("relation '{relation}' already exists on type '{type_name}'")]
    RelationExists { type_name: String, relation: String },

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid migration name: {0}")]
    InvalidMigrationName(String),

    #[error("{stage} failed for '{entity}': {source}")]
    Context {
        stage: String,
        entity: String,
        source: Box<MigrateError>,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

impl MigrateError {
    pub(crate) fn parse(kind: ParseErrorKind, fragment: impl Into<String>) -> Self {
        MigrateError::Parse {
            kind,
            fragment: fragment.into(),
            line: None,
        }
    }

    /// Attach a 1-based line number to a parse error. Other errors pass through.
    pub(crate) fn at_line(self, at: usize) -> Self {
        match self {
            MigrateError::Parse { kind, fragment, .. } => MigrateError::Parse {
                kind,
                fragment,
                line: Some(at),
            },
            other => other,
        }
    }

    /// Wrap this error with the pipeline stage and entity it occurred in.
    pub fn context(self, stage: impl Into<String>, entity: impl Into<String>) -> Self {
        MigrateError::Context {
            stage: stage.into(),
            entity: entity.into(),
            source: Box::new(self),
        }
    }

    /// The parse error kind, looking through any context wrapping.
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            MigrateError::Parse { kind, .. } => Some(*kind),
            MigrateError::Context { source, .. } => source.parse_kind(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        MigrateError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Serialization(err.to_string())
    }
}
