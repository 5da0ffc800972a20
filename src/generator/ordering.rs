//! Forward ordering of changes, with dependency sorting of added relations.

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::warn;

use crate::parser::{is_identifier, parse_expression};
use crate::types::{ChangeKind, Expression, ModelChange};

const KIND_ORDER: [ChangeKind; 7] = [
    ChangeKind::AddType,
    ChangeKind::AddRelation,
    ChangeKind::UpdateRelation,
    ChangeKind::RenameRelation,
    ChangeKind::RenameType,
    ChangeKind::RemoveRelation,
    ChangeKind::RemoveType,
];

const KEYWORDS: [&str; 5] = ["or", "and", "but", "not", "from"];

#[derive(Debug)]
pub(crate) struct Ordered<'a> {
    pub changes: Vec<&'a ModelChange>,
    /// `type.relation` names left in a dependency cycle, in input order.
    pub cycle: Vec<String>,
}

/// Order changes for the forward migration.
pub(crate) fn order_forward(changes: &[ModelChange]) -> Ordered<'_> {
    let mut ordered = Vec::with_capacity(changes.len());
    let mut cycle = Vec::new();

    for kind in KIND_ORDER {
        let group: Vec<&ModelChange> = changes.iter().filter(|c| c.kind == kind).collect();
        if kind == ChangeKind::AddRelation {
            let (sorted, stuck) = sort_by_dependencies(group);
            ordered.extend(sorted);
            cycle = stuck;
        } else {
            ordered.extend(group);
        }
    }

    Ordered {
        changes: ordered,
        cycle,
    }
}

/// Kahn's algorithm over added relations. Nodes still blocked at the end are
/// appended in input order and their names returned.
fn sort_by_dependencies(adds: Vec<&ModelChange>) -> (Vec<&ModelChange>, Vec<String>) {
    let index: HashMap<(&str, &str), usize> = adds
        .iter()
        .enumerate()
        .map(|(i, c)| ((c.type_name.as_str(), c.relation()), i))
        .collect();

    let mut in_degree = vec![0usize; adds.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); adds.len()];
    for (i, change) in adds.iter().enumerate() {
        for dep in dependencies(change, &index) {
            if dep != i {
                in_degree[i] += 1;
                dependents[dep].push(i);
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..adds.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut emitted = vec![false; adds.len()];
    let mut sorted = Vec::with_capacity(adds.len());

    while let Some(i) = queue.pop_front() {
        emitted[i] = true;
        sorted.push(adds[i]);
        for &next in &dependents[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    let mut stuck = Vec::new();
    for (i, change) in adds.iter().enumerate() {
        if !emitted[i] {
            stuck.push(format!("{}.{}", change.type_name, change.relation()));
            sorted.push(*change);
        }
    }

    if !stuck.is_empty() {
        warn!(
            event = "Generate",
            phase = "Order",
            relations = stuck.join(", "),
            "Dependency cycle among added relations; keeping declaration order"
        );
    }

    (sorted, stuck)
}

/// Indices of the added relations `change` refers to.
fn dependencies(change: &ModelChange, index: &HashMap<(&str, &str), usize>) -> BTreeSet<usize> {
    let type_name = change.type_name.as_str();
    let definition = change.new_str();
    let mut deps = BTreeSet::new();

    let by_name = |relation: &str, deps: &mut BTreeSet<usize>| {
        if let Some(&i) = index.get(&(type_name, relation)) {
            deps.insert(i);
        } else {
            deps.extend(
                index
                    .iter()
                    .filter(|((_, r), _)| *r == relation)
                    .map(|(_, &i)| i),
            );
        }
    };

    match parse_expression(definition) {
        Ok(expr) => {
            collect_references(&expr, &mut |reference| match reference {
                Reference::Relation(relation) => by_name(relation, &mut deps),
                Reference::Tupleset { tupleset, computed } => {
                    if let Some(&i) = index.get(&(tupleset, computed)) {
                        deps.insert(i);
                    }
                    if let Some(&i) = index.get(&(type_name, tupleset)) {
                        deps.insert(i);
                    }
                }
                Reference::Userset {
                    type_name: other,
                    relation,
                } => {
                    if let Some(&i) = index.get(&(other, relation)) {
                        deps.insert(i);
                    }
                }
            });
        }
        Err(_) => {
            for token in definition
                .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .filter(|t| !t.is_empty() && is_identifier(t) && !KEYWORDS.contains(t))
            {
                by_name(token, &mut deps);
            }
        }
    }

    deps
}

enum Reference<'e> {
    Relation(&'e str),
    Tupleset { tupleset: &'e str, computed: &'e str },
    /// A `type#relation` entry of a direct grant.
    Userset { type_name: &'e str, relation: &'e str },
}

fn collect_references<'e>(expr: &'e Expression, visit: &mut impl FnMut(Reference<'e>)) {
    match expr {
        Expression::Direct(types) => {
            for reference in types {
                if let Some(relation) = &reference.relation {
                    visit(Reference::Userset {
                        type_name: &reference.type_name,
                        relation,
                    });
                }
            }
        }
        Expression::Computed { relation } => visit(Reference::Relation(relation)),
        Expression::TupleToUserset { tupleset, computed } => visit(Reference::Tupleset {
            tupleset,
            computed,
        }),
        Expression::Union(children) | Expression::Intersection(children) => {
            for child in children {
                collect_references(child, visit);
            }
        }
        Expression::Difference { base, subtract } => {
            collect_references(base, visit);
            collect_references(subtract, visit);
        }
    }
}
