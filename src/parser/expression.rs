//! Relation-definition expressions.
//!
//! Connectives are found by literal substring search, tried in a fixed order
//! at each level: ` or `, ` and `, ` but not `, then `[...]`, ` from `, `->`,
//! and finally a bare identifier. This is not operator precedence, and there
//! is no grouping: an expression needing parentheses does not parse. Names
//! containing a connective surrounded by spaces cannot occur since names have
//! no spaces.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{MigrateError, ParseErrorKind};
use crate::types::{Expression, RelationReference};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("identifier pattern is valid")
});

const OR: &str = " or ";
const AND: &str = " and ";
const BUT_NOT: &str = " but not ";
const FROM: &str = " from ";
const ARROW: &str = "->";

pub(crate) fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Parse one relation definition, e.g. `[user] or owner`.
pub fn parse_expression(expr: &str) -> Result<Expression, MigrateError> {
    let def = expr.trim();

    if def.contains(OR) {
        return Ok(Expression::Union(parse_all(def.split(OR))?));
    }

    if def.contains(AND) {
        return Ok(Expression::Intersection(parse_all(def.split(AND))?));
    }

    if def.contains(BUT_NOT) {
        let parts: Vec<&str> = def.split(BUT_NOT).collect();
        let [base, subtract] = parts.as_slice() else {
            return Err(MigrateError::parse(
                ParseErrorKind::InvalidDifferenceSyntax,
                def,
            ));
        };
        return Ok(Expression::difference(
            parse_expression(base)?,
            parse_expression(subtract)?,
        ));
    }

    if def.starts_with('[') && def.ends_with(']') {
        return Ok(Expression::Direct(parse_direct_types(def)?));
    }

    if def.contains(FROM) {
        let (computed, tupleset) = split_pair(def, FROM)?;
        return Ok(Expression::tuple_to_userset(tupleset, computed));
    }

    if def.contains(ARROW) {
        let (tupleset, computed) = split_pair(def, ARROW)?;
        return Ok(Expression::tuple_to_userset(tupleset, computed));
    }

    if is_identifier(def) {
        return Ok(Expression::computed(def));
    }

    Err(MigrateError::parse(
        ParseErrorKind::UnparseableExpression,
        def,
    ))
}

fn parse_all<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<Expression>, MigrateError> {
    parts.map(parse_expression).collect()
}

fn split_pair<'a>(def: &'a str, separator: &str) -> Result<(&'a str, &'a str), MigrateError> {
    let parts: Vec<&str> = def.split(separator).map(str::trim).collect();
    match parts.as_slice() {
        [left, right] if is_identifier(left) && is_identifier(right) => Ok((left, right)),
        [_, _] => Err(MigrateError::parse(
            ParseErrorKind::UnparseableExpression,
            def,
        )),
        _ => Err(MigrateError::parse(
            ParseErrorKind::InvalidTupleToUsersetFormat,
            def,
        )),
    }
}

/// Parse the interior of a `[type, type#relation]` list.
pub fn parse_direct_types(def: &str) -> Result<Vec<RelationReference>, MigrateError> {
    let inner = def
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| MigrateError::parse(ParseErrorKind::UnparseableExpression, def))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::parse::<RelationReference>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_union_of_two_computed() {
        let expr = parse_expression("owner or editor").unwrap();
        assert_eq!(
            expr,
            Expression::Union(vec![
                Expression::computed("owner"),
                Expression::computed("editor"),
            ])
        );
    }

    #[test]
    fn test_direct_or_computed() {
        let expr = parse_expression("[user, group#member] or owner").unwrap();
        assert_eq!(
            expr,
            Expression::Union(vec![
                Expression::direct([
                    RelationReference::new("user"),
                    RelationReference::with_relation("group", "member"),
                ]),
                Expression::computed("owner"),
            ])
        );
    }

    #[test]
    fn test_intersection() {
        let expr = parse_expression("member and approved").unwrap();
        assert_eq!(
            expr,
            Expression::Intersection(vec![
                Expression::computed("member"),
                Expression::computed("approved"),
            ])
        );
    }

    #[test]
    fn test_difference() {
        let expr = parse_expression("[user] but not blocked").unwrap();
        assert_eq!(
            expr,
            Expression::difference(
                Expression::direct([RelationReference::new("user")]),
                Expression::computed("blocked")
            )
        );
    }

    #[test]
    fn test_or_splits_before_and() {
        let expr = parse_expression("owner or editor and approved").unwrap();
        assert_eq!(
            expr,
            Expression::Union(vec![
                Expression::computed("owner"),
                Expression::Intersection(vec![
                    Expression::computed("editor"),
                    Expression::computed("approved"),
                ]),
            ])
        );
    }

    #[parameterized(
        from_syntax = { "member from team" },
        arrow_syntax = { "team->member" },
        arrow_with_spaces = { "team -> member" },
    )]
    fn test_tuple_to_userset_forms_normalize(input: &str) {
        assert_eq!(
            parse_expression(input).unwrap(),
            Expression::tuple_to_userset("team", "member")
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let input = "[user] or viewer from parent or editor but not blocked";
        let first = parse_expression(input).unwrap();
        let second = parse_expression(input).unwrap();
        assert_eq!(first.render(), second.render());
        assert_eq!(first.render(), input);
    }

    #[parameterized(
        union = { "[user] or [group#member]" },
        difference = { "[user] but not [bot]" },
        mixed = { "[user, team#member] or owner or [group#member] but not [bot]" },
    )]
    fn test_multiple_direct_grants_render_back(input: &str) {
        assert_eq!(parse_expression(input).unwrap().render(), input);
    }

    #[test]
    fn test_multiple_direct_grants_keep_their_types() {
        assert_eq!(
            parse_expression("[user] but not [bot]").unwrap(),
            Expression::difference(
                Expression::direct([RelationReference::new("user")]),
                Expression::direct([RelationReference::new("bot")]),
            )
        );
    }

    #[parameterized(
        chained_but_not = { "a but not b but not c", ParseErrorKind::InvalidDifferenceSyntax },
        double_arrow = { "a->b->c", ParseErrorKind::InvalidTupleToUsersetFormat },
        double_from = { "a from b from c", ParseErrorKind::InvalidTupleToUsersetFormat },
        parentheses = { "(owner or editor) and approved", ParseErrorKind::UnparseableExpression },
        leading_digit = { "1owner", ParseErrorKind::UnparseableExpression },
        trailing_comment = { "[user] # comment", ParseErrorKind::UnparseableExpression },
        empty = { "", ParseErrorKind::UnparseableExpression },
        bad_reference = { "[group#member#x]", ParseErrorKind::InvalidTypeRelationReference },
    )]
    fn test_parse_failures(input: &str, kind: ParseErrorKind) {
        let err = parse_expression(input).unwrap_err();
        assert_eq!(err.parse_kind(), Some(kind));
    }

    #[test]
    fn test_parse_direct_types() {
        let refs = parse_direct_types("[user, group#member, ]").unwrap();
        assert_eq!(
            refs,
            vec![
                RelationReference::new("user"),
                RelationReference::with_relation("group", "member"),
            ]
        );
    }
}
