//! Line-oriented parser for schema documents.

use tracing::{debug, warn};

use crate::error::{MigrateError, ParseErrorKind};
use crate::types::{Expression, Model, Relation, RelationMetadata, TypeDefinition};

use super::expression::parse_expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    OutsideType,
    TypeHeader,
    Relations,
}

/// Parse a full schema document into a [`Model`].
///
/// An empty document yields a model with no types and the default schema
/// version.
pub fn parse_document(text: &str) -> Result<Model, MigrateError> {
    let mut model = Model::default();
    let mut current: Option<TypeDefinition> = None;
    let mut state = State::OutsideType;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let line_no = idx + 1;

        if line.is_empty() || line.starts_with('#') || line == "model" {
            continue;
        }

        if let Some(version) = line.strip_prefix("schema ") {
            model.schema_version = version.trim().to_string();
            continue;
        }

        if let Some(name) = line.strip_prefix("type ") {
            if let Some(done) = current.take() {
                model.type_definitions.push(done);
            }
            current = Some(TypeDefinition::new(name.trim()));
            state = State::TypeHeader;
            continue;
        }

        if line == "relations" {
            if current.is_none() {
                return Err(
                    MigrateError::parse(ParseErrorKind::RelationOutsideType, line).at_line(line_no),
                );
            }
            state = State::Relations;
            continue;
        }

        // A define outside a relations block falls through to the skip below.
        if let (Some(rest), State::Relations, Some(type_def)) =
            (line.strip_prefix("define "), state, current.as_mut())
        {
            let relation = parse_define(rest).map_err(|e| e.at_line(line_no))?;
            type_def.insert_relation(relation);
            continue;
        }

        warn!(
            event = "ParseDocument",
            phase = "SkipLine",
            line = line_no,
            content = line,
            "Skipping unrecognised line"
        );
    }

    if let Some(done) = current.take() {
        model.type_definitions.push(done);
    }

    debug!(
        event = "ParseDocument",
        phase = "Complete",
        schema_version = model.schema_version.as_str(),
        types = model.type_definitions.len(),
    );

    Ok(model)
}

fn parse_define(rest: &str) -> Result<Relation, MigrateError> {
    let Some((name, definition)) = rest.split_once(':') else {
        return Err(MigrateError::parse(
            ParseErrorKind::InvalidRelationDefinition,
            format!("define {rest}"),
        ));
    };
    if name.trim().is_empty() {
        return Err(MigrateError::parse(
            ParseErrorKind::InvalidRelationDefinition,
            format!("define {rest}"),
        ));
    }
    parse_relation(name, definition)
}

/// Build a relation from its name and DSL definition, with the same
/// metadata a `define` line would get.
pub fn parse_relation(name: &str, definition: &str) -> Result<Relation, MigrateError> {
    let rewrite = parse_expression(definition.trim())?;
    let metadata = relation_metadata(&rewrite);
    Ok(Relation::new(name.trim(), rewrite).with_metadata(metadata))
}

/// A top-level tuple-to-userset records the tupleset relation as the type it
/// points at.
fn relation_metadata(rewrite: &Expression) -> RelationMetadata {
    let mut metadata = RelationMetadata::default();
    if let Expression::TupleToUserset { tupleset, .. } = rewrite {
        metadata.tupleset_type = Some(tupleset.clone());
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RelationReference;
    use yare::parameterized;

    const DOC: &str = r#"
# Document sharing model
model
  schema 1.1

type user

type group
  relations
    define member: [user]

type folder
  relations
    define owner: [user]
    define viewer: [user, group#member] or owner

type document
  relations
    define parent: [folder]
    define owner: [user]
    define viewer: viewer from parent or owner
    define editor: parent->owner
"#;

    #[test]
    fn test_parse_document_types_in_order() {
        let model = parse_document(DOC).unwrap();
        assert_eq!(model.schema_version, "1.1");
        assert_eq!(model.type_names(), vec!["user", "group", "folder", "document"]);
        assert!(model.type_definition("user").unwrap().relations.is_empty());
    }

    #[test]
    fn test_direct_types_stay_on_the_rewrite() {
        let model = parse_document(DOC).unwrap();
        let viewer = model
            .type_definition("folder")
            .unwrap()
            .relation("viewer")
            .unwrap();
        assert_eq!(
            viewer.directly_related(),
            vec![
                RelationReference::new("user"),
                RelationReference::with_relation("group", "member"),
            ]
        );
        assert_eq!(viewer.metadata.tupleset_type, None);
        assert_eq!(viewer.definition(), "[user, group#member] or owner");
    }

    #[test]
    fn test_tuple_to_userset_records_tupleset_type() {
        let model = parse_document(DOC).unwrap();
        let editor = model
            .type_definition("document")
            .unwrap()
            .relation("editor")
            .unwrap();
        assert_eq!(editor.rewrite, Expression::tuple_to_userset("parent", "owner"));
        assert_eq!(editor.metadata.tupleset_type.as_deref(), Some("parent"));
        assert!(editor.directly_related().is_empty());
    }

    #[test]
    fn test_computed_union_has_no_metadata() {
        let model = parse_document(DOC).unwrap();
        let viewer = model
            .type_definition("document")
            .unwrap()
            .relation("viewer")
            .unwrap();
        assert_eq!(viewer.metadata, RelationMetadata::default());
    }

    #[test]
    fn test_empty_document() {
        let model = parse_document("").unwrap();
        assert_eq!(model, Model::default());
    }

    #[test]
    fn test_last_schema_line_wins() {
        let model = parse_document("model\n  schema 1.0\n  schema 1.2\n").unwrap();
        assert_eq!(model.schema_version, "1.2");
    }

    #[test]
    fn test_unknown_lines_are_skipped() {
        let model = parse_document("type user\n  conditions\n").unwrap();
        assert_eq!(model.type_names(), vec!["user"]);
    }

    #[parameterized(
        in_type_header = { "type doc\n  define owner: [user]\n  relations\n    define viewer: [user]\n" },
        before_any_type = { "define owner: [user]\ntype doc\n  relations\n    define viewer: [user]\n" },
    )]
    fn test_define_outside_relations_is_skipped(input: &str) {
        let model = parse_document(input).unwrap();
        let doc = model.type_definition("doc").unwrap();
        let names: Vec<&str> = doc.relations.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["viewer"]);
    }

    #[test]
    fn test_define_splits_on_first_colon_only() {
        let err = parse_document("type doc\n  relations\n    define owner: a:b\n").unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnparseableExpression));
        assert_eq!(err.to_string(), "UnparseableExpression at line 3: a:b");
    }

    #[parameterized(
        relations_without_type = { "relations\n", ParseErrorKind::RelationOutsideType, 1 },
        missing_colon = { "type doc\n  relations\n    define owner [user]\n", ParseErrorKind::InvalidRelationDefinition, 3 },
        empty_name = { "type doc\n  relations\n    define : [user]\n", ParseErrorKind::InvalidRelationDefinition, 3 },
        bad_expression = { "type doc\n\n  relations\n    define owner: a but not b but not c\n", ParseErrorKind::InvalidDifferenceSyntax, 4 },
    )]
    fn test_parse_document_errors(input: &str, kind: ParseErrorKind, line: usize) {
        let err = parse_document(input).unwrap_err();
        assert_eq!(err.parse_kind(), Some(kind));
        assert!(
            matches!(err, MigrateError::Parse { line: Some(l), .. } if l == line),
            "unexpected error: {err}"
        );
    }
}
