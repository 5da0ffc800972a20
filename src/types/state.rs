//! Comparison-normalized model snapshots.
//!
//! A `ModelState` keeps only what a diff needs: type name to relation name to
//! relation rule. Relations compare structurally, each direct grant with its
//! own type list, and render to DSL text for change records.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;
use crate::live_schema::AuthorizationModel;

use super::expression::Expression;
use super::model::{Model, Relation};

/// The comparable form of one relation: its rewrite tree, type restrictions
/// included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationState {
    pub rewrite: Expression,
}

impl From<&Relation> for RelationState {
    fn from(relation: &Relation) -> Self {
        Self {
            rewrite: relation.rewrite.clone(),
        }
    }
}

impl Display for RelationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.rewrite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeState {
    pub name: String,
    pub relations: BTreeMap<String, RelationState>,
}

impl TypeState {
    pub fn relation_names(&self) -> BTreeSet<&str> {
        self.relations.keys().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelState {
    pub types: BTreeMap<String, TypeState>,
}

impl ModelState {
    /// Project a structured model into its comparable form.
    pub fn from_model(model: &Model) -> Self {
        let types = model
            .type_definitions
            .iter()
            .map(|type_def| {
                let relations = type_def
                    .relations
                    .iter()
                    .map(|relation| (relation.name.clone(), RelationState::from(relation)))
                    .collect();
                (
                    type_def.name.clone(),
                    TypeState {
                        name: type_def.name.clone(),
                        relations,
                    },
                )
            })
            .collect();
        Self { types }
    }

    /// Project the schema as returned by the authorization service.
    pub fn from_live_schema(schema: &AuthorizationModel) -> Result<Self, MigrateError> {
        let model = Model::try_from(schema)?;
        Ok(Self::from_model(&model))
    }

    pub fn type_state(&self, name: &str) -> Option<&TypeState> {
        self.types.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl From<&Model> for ModelState {
    fn from(model: &Model) -> Self {
        ModelState::from_model(model)
    }
}
