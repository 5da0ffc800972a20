//! Userset rewrite expressions and type references.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{MigrateError, ParseErrorKind};

/// A type that may be directly related through a relation, e.g. `user` or
/// `group#member`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct RelationReference {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl RelationReference {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            relation: None,
        }
    }

    pub fn with_relation(type_name: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            relation: Some(relation.into()),
        }
    }
}

impl Display for RelationReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.relation {
            Some(relation) => write!(f, "{}#{}", self.type_name, relation),
            None => write!(f, "{}", self.type_name),
        }
    }
}

impl FromStr for RelationReference {
    type Err = MigrateError;

    /// Accepts `type` or `type#relation`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let parts: Vec<&str> = token.split('#').collect();
        match parts.as_slice() {
            [type_name] if !type_name.is_empty() => Ok(RelationReference::new(*type_name)),
            [type_name, relation] if !type_name.is_empty() && !relation.is_empty() => {
                Ok(RelationReference::with_relation(*type_name, *relation))
            }
            _ => Err(MigrateError::parse(
                ParseErrorKind::InvalidTypeRelationReference,
                token,
            )),
        }
    }
}

/// The rule defining who satisfies a relation.
///
/// Each `Direct` grant carries the types it admits, so `[user] or
/// [group#member]` keeps both lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Direct(Vec<RelationReference>),
    Computed {
        relation: String,
    },
    Union(Vec<Expression>),
    Intersection(Vec<Expression>),
    Difference {
        base: Box<Expression>,
        subtract: Box<Expression>,
    },
    TupleToUserset {
        tupleset: String,
        computed: String,
    },
}

impl Expression {
    pub fn direct(types: impl IntoIterator<Item = RelationReference>) -> Self {
        Expression::Direct(types.into_iter().collect())
    }

    pub fn computed(relation: impl Into<String>) -> Self {
        Expression::Computed {
            relation: relation.into(),
        }
    }

    pub fn tuple_to_userset(tupleset: impl Into<String>, computed: impl Into<String>) -> Self {
        Expression::TupleToUserset {
            tupleset: tupleset.into(),
            computed: computed.into(),
        }
    }

    pub fn difference(base: Expression, subtract: Expression) -> Self {
        Expression::Difference {
            base: Box::new(base),
            subtract: Box::new(subtract),
        }
    }

    /// Every type admitted by a direct grant, in source order, without repeats.
    pub fn direct_types(&self) -> Vec<&RelationReference> {
        let mut types = Vec::new();
        self.collect_direct(&mut types);
        types
    }

    fn collect_direct<'e>(&'e self, out: &mut Vec<&'e RelationReference>) {
        match self {
            Expression::Direct(types) => {
                for reference in types {
                    if !out.contains(&reference) {
                        out.push(reference);
                    }
                }
            }
            Expression::Computed { .. } | Expression::TupleToUserset { .. } => {}
            Expression::Union(children) | Expression::Intersection(children) => {
                for child in children {
                    child.collect_direct(out);
                }
            }
            Expression::Difference { base, subtract } => {
                base.collect_direct(out);
                subtract.collect_direct(out);
            }
        }
    }

    /// Apply `edit` to the type list of every direct grant.
    pub fn for_each_direct_mut(&mut self, edit: &mut impl FnMut(&mut Vec<RelationReference>)) {
        match self {
            Expression::Direct(types) => edit(types),
            Expression::Computed { .. } | Expression::TupleToUserset { .. } => {}
            Expression::Union(children) | Expression::Intersection(children) => {
                for child in children {
                    child.for_each_direct_mut(edit);
                }
            }
            Expression::Difference { base, subtract } => {
                base.for_each_direct_mut(edit);
                subtract.for_each_direct_mut(edit);
            }
        }
    }

    // Parser split order: `or` first, then `and`, then `but not`, then leaves.
    fn binding(&self) -> u8 {
        match self {
            Expression::Union(_) => 0,
            Expression::Intersection(_) => 1,
            Expression::Difference { .. } => 2,
            _ => 3,
        }
    }

    /// Render in DSL syntax.
    pub fn render(&self) -> String {
        match self {
            Expression::Direct(types) => {
                let types: Vec<String> = types.iter().map(ToString::to_string).collect();
                format!("[{}]", types.join(", "))
            }
            Expression::Computed { relation } => relation.clone(),
            Expression::TupleToUserset { tupleset, computed } => {
                format!("{computed} from {tupleset}")
            }
            Expression::Union(children) => self.render_children(children, " or "),
            Expression::Intersection(children) => self.render_children(children, " and "),
            Expression::Difference { base, subtract } => format!(
                "{} but not {}",
                self.render_child(base),
                self.render_child(subtract)
            ),
        }
    }

    fn render_children(&self, children: &[Expression], connective: &str) -> String {
        children
            .iter()
            .map(|child| self.render_child(child))
            .collect::<Vec<_>>()
            .join(connective)
    }

    fn render_child(&self, child: &Expression) -> String {
        let text = child.render();
        if child.binding() <= self.binding() {
            format!("({text})")
        } else {
            text
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use yare::parameterized;

    #[parameterized(
        bare_type = { "user", "user", None },
        userset = { "group#member", "group", Some("member") },
        padded = { "  team#admin ", "team", Some("admin") },
    )]
    fn test_relation_reference_from_str(input: &str, type_name: &str, relation: Option<&str>) {
        let reference = RelationReference::from_str(input).unwrap();
        assert_eq!(reference.type_name, type_name);
        assert_eq!(reference.relation.as_deref(), relation);
    }

    #[parameterized(
        double_hash = { "group#member#extra" },
        empty_relation = { "group#" },
        empty_type = { "#member" },
    )]
    fn test_relation_reference_rejects(input: &str) {
        let err = RelationReference::from_str(input).unwrap_err();
        assert_eq!(
            err.parse_kind(),
            Some(ParseErrorKind::InvalidTypeRelationReference)
        );
    }

    fn user() -> RelationReference {
        RelationReference::new("user")
    }

    #[test]
    fn test_render_union_with_direct() {
        let expr = Expression::Union(vec![
            Expression::direct([user(), RelationReference::with_relation("group", "member")]),
            Expression::computed("owner"),
        ]);
        assert_snapshot!(expr.render(), @"[user, group#member] or owner");
    }

    #[test]
    fn test_each_direct_grant_keeps_its_own_types() {
        let expr = Expression::difference(
            Expression::direct([user()]),
            Expression::direct([RelationReference::new("bot")]),
        );
        assert_eq!(expr.render(), "[user] but not [bot]");

        let other = Expression::difference(
            Expression::direct([user()]),
            Expression::direct([RelationReference::new("robot")]),
        );
        assert_ne!(expr, other);
    }

    #[test]
    fn test_direct_types_in_source_order_without_repeats() {
        let expr = Expression::Union(vec![
            Expression::direct([user()]),
            Expression::direct([RelationReference::with_relation("group", "member"), user()]),
        ]);
        let types: Vec<String> = expr.direct_types().iter().map(ToString::to_string).collect();
        assert_eq!(types, vec!["user", "group#member"]);
    }

    #[test]
    fn test_for_each_direct_mut_reaches_nested_grants() {
        let mut expr = Expression::difference(
            Expression::Union(vec![Expression::direct([user()]), Expression::computed("owner")]),
            Expression::direct([user()]),
        );
        expr.for_each_direct_mut(&mut |types| types.push(RelationReference::new("bot")));
        assert_eq!(expr.render(), "([user, bot] or owner) but not [user, bot]");
    }

    #[test]
    fn test_render_tuple_to_userset_uses_from_syntax() {
        let expr = Expression::tuple_to_userset("parent", "viewer");
        assert_eq!(expr.to_string(), "viewer from parent");
    }

    #[test]
    fn test_render_keeps_parser_shapes_unparenthesised() {
        let expr = Expression::Union(vec![
            Expression::computed("owner"),
            Expression::Intersection(vec![
                Expression::computed("editor"),
                Expression::difference(
                    Expression::computed("member"),
                    Expression::computed("blocked"),
                ),
            ]),
        ]);
        assert_eq!(
            expr.render(),
            "owner or editor and member but not blocked"
        );
    }

    #[test]
    fn test_render_parenthesises_shapes_the_parser_cannot_read() {
        let expr = Expression::difference(
            Expression::Union(vec![
                Expression::computed("owner"),
                Expression::computed("editor"),
            ]),
            Expression::computed("blocked"),
        );
        assert_eq!(expr.render(), "(owner or editor) but not blocked");
    }
}
