//! The authorization service's JSON schema representation.
//!
//! This mirrors what the service returns from its schema-read call and
//! accepts on write. Usersets are objects where exactly one of `this`,
//! `computedUserset`, `tupleToUserset`, `union`, `intersection` or
//! `difference` is set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, ParseErrorKind};
use crate::types::{
    DEFAULT_SCHEMA_VERSION, Expression, Model, Relation, RelationMetadata as ModelRelationMetadata,
    RelationReference, TypeDefinition as ModelTypeDefinition,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationModel {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub type_definitions: Vec<TypeDefinition>,
}

fn default_schema_version() -> String {
    DEFAULT_SCHEMA_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<BTreeMap<String, Userset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TypeMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<BTreeMap<String, RelationMetadata>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMetadata {
    #[serde(default)]
    pub directly_related_user_types: Vec<RelationReference>,
}

/// Serialized as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyObject {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRelation {
    #[serde(default)]
    pub relation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleToUsersetDef {
    pub tupleset: ObjectRelation,
    #[serde(rename = "computedUserset")]
    pub computed_userset: ObjectRelation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usersets {
    #[serde(default)]
    pub child: Vec<Userset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferenceDef {
    pub base: Box<Userset>,
    pub subtract: Box<Userset>,
}

/// A userset rewrite rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Userset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub this: Option<EmptyObject>,
    #[serde(
        rename = "computedUserset",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub computed_userset: Option<ObjectRelation>,
    #[serde(
        rename = "tupleToUserset",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tuple_to_userset: Option<TupleToUsersetDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union: Option<Usersets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intersection: Option<Usersets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<DifferenceDef>,
}

impl AuthorizationModel {
    pub fn from_json(json: &str) -> Result<Self, MigrateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, MigrateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Userset {
    /// Convert to an expression. `owner` names the `type.relation` for errors.
    /// The service keeps one type list per relation, so every `this` gets
    /// all of `direct`.
    pub fn to_expression(
        &self,
        owner: &str,
        direct: &[RelationReference],
    ) -> Result<Expression, MigrateError> {
        if self.this.is_some() {
            return Ok(Expression::direct(direct.iter().cloned()));
        }
        if let Some(computed) = &self.computed_userset {
            return Ok(Expression::computed(computed.relation.as_str()));
        }
        if let Some(ttu) = &self.tuple_to_userset {
            return Ok(Expression::tuple_to_userset(
                ttu.tupleset.relation.as_str(),
                ttu.computed_userset.relation.as_str(),
            ));
        }
        if let Some(union) = &self.union {
            return Ok(Expression::Union(children(&union.child, owner, direct)?));
        }
        if let Some(intersection) = &self.intersection {
            return Ok(Expression::Intersection(children(
                &intersection.child,
                owner,
                direct,
            )?));
        }
        if let Some(difference) = &self.difference {
            return Ok(Expression::difference(
                difference.base.to_expression(owner, direct)?,
                difference.subtract.to_expression(owner, direct)?,
            ));
        }
        Err(MigrateError::parse(
            ParseErrorKind::UnparseableExpression,
            format!("empty userset for '{owner}'"),
        ))
    }
}

fn children(
    usersets: &[Userset],
    owner: &str,
    direct: &[RelationReference],
) -> Result<Vec<Expression>, MigrateError> {
    usersets
        .iter()
        .map(|u| u.to_expression(owner, direct))
        .collect()
}

impl From<&Expression> for Userset {
    fn from(expr: &Expression) -> Self {
        match expr {
            Expression::Direct(_) => Userset {
                this: Some(EmptyObject {}),
                ..Default::default()
            },
            Expression::Computed { relation } => Userset {
                computed_userset: Some(ObjectRelation {
                    relation: relation.clone(),
                }),
                ..Default::default()
            },
            Expression::TupleToUserset { tupleset, computed } => Userset {
                tuple_to_userset: Some(TupleToUsersetDef {
                    tupleset: ObjectRelation {
                        relation: tupleset.clone(),
                    },
                    computed_userset: ObjectRelation {
                        relation: computed.clone(),
                    },
                }),
                ..Default::default()
            },
            Expression::Union(items) => Userset {
                union: Some(Usersets {
                    child: items.iter().map(Userset::from).collect(),
                }),
                ..Default::default()
            },
            Expression::Intersection(items) => Userset {
                intersection: Some(Usersets {
                    child: items.iter().map(Userset::from).collect(),
                }),
                ..Default::default()
            },
            Expression::Difference { base, subtract } => Userset {
                difference: Some(DifferenceDef {
                    base: Box::new(Userset::from(base.as_ref())),
                    subtract: Box::new(Userset::from(subtract.as_ref())),
                }),
                ..Default::default()
            },
        }
    }
}

impl TryFrom<&AuthorizationModel> for Model {
    type Error = MigrateError;

    fn try_from(schema: &AuthorizationModel) -> Result<Self, Self::Error> {
        let type_definitions = schema
            .type_definitions
            .iter()
            .map(|type_def| {
                let mut converted = ModelTypeDefinition::new(type_def.type_name.as_str());
                for (name, userset) in type_def.relations.iter().flatten() {
                    let rewrite = userset.to_expression(
                        &format!("{}.{name}", type_def.type_name),
                        type_def.directly_related(name),
                    )?;
                    let tupleset_type = match &rewrite {
                        Expression::TupleToUserset { tupleset, .. } => Some(tupleset.clone()),
                        _ => None,
                    };
                    converted.insert_relation(Relation::new(name.as_str(), rewrite).with_metadata(
                        ModelRelationMetadata { tupleset_type },
                    ));
                }
                Ok(converted)
            })
            .collect::<Result<Vec<_>, MigrateError>>()?;

        Ok(Model {
            schema_version: schema.schema_version.clone(),
            type_definitions,
        })
    }
}

impl TypeDefinition {
    pub fn directly_related(&self, relation: &str) -> &[RelationReference] {
        self.metadata
            .as_ref()
            .and_then(|m| m.relations.as_ref())
            .and_then(|relations| relations.get(relation))
            .map(|m| m.directly_related_user_types.as_slice())
            .unwrap_or_default()
    }
}

impl From<&Model> for AuthorizationModel {
    fn from(model: &Model) -> Self {
        let type_definitions = model
            .type_definitions
            .iter()
            .map(|type_def| {
                let relations: BTreeMap<String, Userset> = type_def
                    .relations
                    .iter()
                    .map(|r| (r.name.clone(), Userset::from(&r.rewrite)))
                    .collect();
                let metadata: BTreeMap<String, RelationMetadata> = type_def
                    .relations
                    .iter()
                    .filter(|r| !r.directly_related().is_empty())
                    .map(|r| {
                        (
                            r.name.clone(),
                            RelationMetadata {
                                directly_related_user_types: r.directly_related(),
                            },
                        )
                    })
                    .collect();
                TypeDefinition {
                    type_name: type_def.name.clone(),
                    relations: (!relations.is_empty()).then_some(relations),
                    metadata: (!metadata.is_empty()).then(|| TypeMetadata {
                        relations: Some(metadata),
                    }),
                }
            })
            .collect();

        AuthorizationModel {
            schema_version: model.schema_version.clone(),
            type_definitions,
        }
    }
}
