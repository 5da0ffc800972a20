//! Detected schema differences.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// The kind of a detected change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
    AddType,
    RemoveType,
    RenameType,
    AddRelation,
    RemoveRelation,
    RenameRelation,
    UpdateRelation,
}

impl ChangeKind {
    pub fn is_rename(self) -> bool {
        matches!(self, ChangeKind::RenameType | ChangeKind::RenameRelation)
    }

    /// Short marker used in change summaries.
    pub fn symbol(self) -> &'static str {
        match self {
            ChangeKind::AddType | ChangeKind::AddRelation => "+",
            ChangeKind::RemoveType | ChangeKind::RemoveRelation => "-",
            ChangeKind::UpdateRelation => "~",
            ChangeKind::RenameType | ChangeKind::RenameRelation => "→",
        }
    }
}

/// Heuristic certainty attached to an inferred rename. Ordered `None < Low <
/// Medium < High`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Confidence {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// One atomic difference between two model states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ModelChange {
    pub kind: ChangeKind,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub details: String,
    /// Only set on rename kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

impl ModelChange {
    fn base(kind: ChangeKind, type_name: &str, details: String) -> Self {
        Self {
            kind,
            type_name: type_name.to_string(),
            relation_name: None,
            old_value: None,
            new_value: None,
            details,
            confidence: None,
        }
    }

    pub fn add_type(type_name: &str, relation_count: usize) -> Self {
        Self::base(
            ChangeKind::AddType,
            type_name,
            format!("New type '{type_name}' with {relation_count} relations"),
        )
    }

    pub fn remove_type(type_name: &str) -> Self {
        Self::base(
            ChangeKind::RemoveType,
            type_name,
            format!("Type '{type_name}' removed"),
        )
    }

    pub fn add_relation(type_name: &str, relation: &str, definition: String) -> Self {
        Self {
            relation_name: Some(relation.to_string()),
            new_value: Some(definition),
            ..Self::base(
                ChangeKind::AddRelation,
                type_name,
                format!("Added relation '{type_name}.{relation}'"),
            )
        }
    }

    pub fn remove_relation(type_name: &str, relation: &str, definition: String) -> Self {
        Self {
            relation_name: Some(relation.to_string()),
            old_value: Some(definition),
            ..Self::base(
                ChangeKind::RemoveRelation,
                type_name,
                format!("Removed relation '{type_name}.{relation}'"),
            )
        }
    }

    pub fn update_relation(type_name: &str, relation: &str, old: String, new: String) -> Self {
        Self {
            relation_name: Some(relation.to_string()),
            old_value: Some(old),
            new_value: Some(new),
            ..Self::base(
                ChangeKind::UpdateRelation,
                type_name,
                format!("Updated relation '{type_name}.{relation}' definition"),
            )
        }
    }

    pub fn rename_type(old: &str, new: &str, confidence: Confidence, details: String) -> Self {
        Self {
            old_value: Some(old.to_string()),
            new_value: Some(new.to_string()),
            confidence: Some(confidence),
            ..Self::base(ChangeKind::RenameType, old, details)
        }
    }

    pub fn rename_relation(
        type_name: &str,
        old: &str,
        new: &str,
        confidence: Confidence,
        details: String,
    ) -> Self {
        Self {
            relation_name: Some(old.to_string()),
            old_value: Some(old.to_string()),
            new_value: Some(new.to_string()),
            confidence: Some(confidence),
            ..Self::base(ChangeKind::RenameRelation, type_name, details)
        }
    }

    pub fn relation(&self) -> &str {
        self.relation_name.as_deref().unwrap_or_default()
    }

    pub fn old_str(&self) -> &str {
        self.old_value.as_deref().unwrap_or_default()
    }

    pub fn new_str(&self) -> &str {
        self.new_value.as_deref().unwrap_or_default()
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence.unwrap_or_default()
    }
}

impl Display for ModelChange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} {}", self.kind.symbol(), self.details)
    }
}
