//! Relationship tuples and read filters.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One fact in the authorization store: `user` has `relation` on `object`.
///
/// `object` is conventionally `<type>:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct Tuple {
    pub user: String,
    pub relation: String,
    pub object: String,
}

impl Tuple {
    pub fn new(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// The `<type>` part of the object.
    pub fn object_type(&self) -> &str {
        self.object
            .split_once(':')
            .map(|(object_type, _)| object_type)
            .unwrap_or(self.object.as_str())
    }

    /// The `<id>` part of the object.
    pub fn object_id(&self) -> &str {
        self.object
            .split_once(':')
            .map(|(_, id)| id)
            .unwrap_or_default()
    }

    /// Same tuple with the object's type replaced.
    pub fn with_object_type(&self, object_type: &str) -> Self {
        Self {
            user: self.user.clone(),
            relation: self.relation.clone(),
            object: format!("{object_type}:{}", self.object_id()),
        }
    }

    /// Same tuple with the relation replaced.
    pub fn with_relation(&self, relation: &str) -> Self {
        Self {
            user: self.user.clone(),
            relation: relation.to_string(),
            object: self.object.clone(),
        }
    }
}

impl Display for Tuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)
    }
}

/// Restricts a tuple read to an object type and/or relation. Empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl TupleFilter {
    /// Build a filter where empty strings mean "any".
    pub fn new(object_type: &str, relation: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            object_type: non_empty(object_type),
            relation: non_empty(relation),
        }
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        let type_ok = self
            .object_type
            .as_deref()
            .is_none_or(|t| tuple.object_type() == t);
        let relation_ok = self
            .relation
            .as_deref()
            .is_none_or(|r| tuple.relation == r);
        type_ok && relation_ok
    }
}
