//! Structured authorization models built from the DSL or the live service.

use serde::{Deserialize, Serialize};

use super::expression::{Expression, RelationReference};

pub const DEFAULT_SCHEMA_VERSION: &str = "1.1";

/// Extra facts about a relation that its rewrite does not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationMetadata {
    /// For `X from Y` / `Y->X` definitions, the type the tupleset relation
    /// `Y` is taken to point at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tupleset_type: Option<String>,
}

/// A named access-control rule on a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub rewrite: Expression,
    #[serde(default)]
    pub metadata: RelationMetadata,
}

impl Relation {
    pub fn new(name: impl Into<String>, rewrite: Expression) -> Self {
        Self {
            name: name.into(),
            rewrite,
            metadata: RelationMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: RelationMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Types admitted by any direct grant, in source order.
    pub fn directly_related(&self) -> Vec<RelationReference> {
        self.rewrite.direct_types().into_iter().cloned().collect()
    }

    /// The definition in DSL syntax.
    pub fn definition(&self) -> String {
        self.rewrite.render()
    }
}

/// A named entity kind with its relations, kept in definition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: Vec::new(),
        }
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn relation_mut(&mut self, name: &str) -> Option<&mut Relation> {
        self.relations.iter_mut().find(|r| r.name == name)
    }

    /// Insert a relation; a relation with the same name is replaced in place.
    pub fn insert_relation(&mut self, relation: Relation) {
        match self.relation_mut(&relation.name) {
            Some(existing) => *existing = relation,
            None => self.relations.push(relation),
        }
    }

    pub fn remove_relation(&mut self, name: &str) -> Option<Relation> {
        let idx = self.relations.iter().position(|r| r.name == name)?;
        Some(self.relations.remove(idx))
    }
}

/// A schema version plus its ordered type definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub schema_version: String,
    #[serde(default)]
    pub type_definitions: Vec<TypeDefinition>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            type_definitions: Vec::new(),
        }
    }
}

impl Model {
    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.type_definitions.iter().find(|t| t.name == name)
    }

    pub fn type_definition_mut(&mut self, name: &str) -> Option<&mut TypeDefinition> {
        self.type_definitions.iter_mut().find(|t| t.name == name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.type_definitions.iter().map(|t| t.name.as_str()).collect()
    }
}
