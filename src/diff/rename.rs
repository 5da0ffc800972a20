//! Pairing unmatched removals with additions as likely renames.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::RenameThresholds;
use crate::types::{ChangeKind, Confidence, ModelChange, ModelState};

/// Normalised name similarity in `[0, 1]`, case-insensitive.
///
/// Identical names score 1. When one name contains the other the score is the
/// length ratio. Otherwise it is one minus the edit distance over the longer
/// length.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let longer = a_len.max(b_len);

    if a.contains(&b) || b.contains(&a) {
        return a_len.min(b_len) as f64 / longer as f64;
    }

    1.0 - levenshtein(&a, &b) as f64 / longer as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for j in 1..=b.len() {
            let cost = usize::from(ca != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Jaccard coefficient of two relation-name sets; 0 when either is empty.
pub fn relation_similarity(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    confidence: Confidence,
    name_similarity: f64,
    relation_similarity: f64,
}

impl Candidate {
    fn beats(&self, other: Option<&Candidate>) -> bool {
        other.is_none_or(|best| {
            self.confidence > best.confidence
                || (self.confidence == best.confidence
                    && self.name_similarity > best.name_similarity)
        })
    }
}

/// Pick the best unconsumed addition for one removal.
fn best_candidate(
    additions: &[&ModelChange],
    used: &[bool],
    score: impl Fn(&ModelChange) -> (f64, f64),
    thresholds: &RenameThresholds,
) -> Option<Candidate> {
    let mut best = None;
    for (index, added) in additions.iter().enumerate() {
        if used[index] {
            continue;
        }
        let (name_similarity, relation_similarity) = score(added);
        let confidence = thresholds.tier(name_similarity, relation_similarity);
        if confidence == Confidence::None {
            continue;
        }
        let candidate = Candidate {
            index,
            confidence,
            name_similarity,
            relation_similarity,
        };
        if candidate.beats(best.as_ref()) {
            best = Some(candidate);
        }
    }
    best
}

fn rename_details(old: &str, new: &str, candidate: &Candidate, with_relations: bool) -> String {
    match candidate.confidence {
        Confidence::High if with_relations => format!(
            "Rename detected: '{old}' -> '{new}' (high confidence: {:.0}% name, {:.0}% relations)",
            candidate.name_similarity * 100.0,
            candidate.relation_similarity * 100.0
        ),
        Confidence::High => format!(
            "Rename detected: '{old}' -> '{new}' (high confidence: {:.0}%)",
            candidate.name_similarity * 100.0
        ),
        Confidence::Medium => format!(
            "Possible rename: '{old}' -> '{new}' (medium confidence - review required)"
        ),
        Confidence::Low => format!(
            "Potential rename: '{old}' -> '{new}' (low confidence - verify before using)"
        ),
        Confidence::None => format!("Rename detected: '{old}' -> '{new}'"),
    }
}

/// Replace matched remove/add pairs with rename changes.
///
/// Changes other than type and relation additions and removals pass through
/// first, in input order. Then come type renames and unmatched type changes,
/// then per type (in name order) relation renames and unmatched relation
/// changes. Every consumed pair becomes exactly one rename.
pub fn infer_renames(
    changes: Vec<ModelChange>,
    old: &ModelState,
    new: &ModelState,
    thresholds: &RenameThresholds,
) -> Vec<ModelChange> {
    let mut enhanced = Vec::with_capacity(changes.len());
    let mut added_types = Vec::new();
    let mut removed_types = Vec::new();
    let mut relations_by_type: BTreeMap<String, (Vec<ModelChange>, Vec<ModelChange>)> =
        BTreeMap::new();

    for change in changes {
        match change.kind {
            ChangeKind::AddType => added_types.push(change),
            ChangeKind::RemoveType => removed_types.push(change),
            ChangeKind::AddRelation => relations_by_type
                .entry(change.type_name.clone())
                .or_default()
                .0
                .push(change),
            ChangeKind::RemoveRelation => relations_by_type
                .entry(change.type_name.clone())
                .or_default()
                .1
                .push(change),
            ChangeKind::RenameType | ChangeKind::RenameRelation | ChangeKind::UpdateRelation => {
                enhanced.push(change)
            }
        }
    }

    pair_types(&mut enhanced, added_types, removed_types, old, new, thresholds);

    for (type_name, (added, removed)) in relations_by_type {
        pair_relations(&mut enhanced, &type_name, added, removed, thresholds);
    }

    enhanced
}

fn pair_types(
    out: &mut Vec<ModelChange>,
    added: Vec<ModelChange>,
    removed: Vec<ModelChange>,
    old: &ModelState,
    new: &ModelState,
    thresholds: &RenameThresholds,
) {
    let added_refs: Vec<&ModelChange> = added.iter().collect();
    let mut used_added = vec![false; added.len()];
    let mut used_removed = vec![false; removed.len()];

    for (i, removed_change) in removed.iter().enumerate() {
        let old_name = removed_change.type_name.as_str();
        let old_relations = old
            .type_state(old_name)
            .map(|t| t.relation_names())
            .unwrap_or_default();

        let score = |added_change: &ModelChange| {
            let new_relations = new
                .type_state(&added_change.type_name)
                .map(|t| t.relation_names())
                .unwrap_or_default();
            (
                name_similarity(old_name, &added_change.type_name),
                relation_similarity(&old_relations, &new_relations),
            )
        };

        let Some(candidate) = best_candidate(&added_refs, &used_added, score, thresholds) else {
            continue;
        };
        let new_name = added[candidate.index].type_name.as_str();

        debug!(
            event = "InferRenames",
            phase = "Type",
            old = old_name,
            new = new_name,
            name_similarity = candidate.name_similarity,
            relation_similarity = candidate.relation_similarity,
            confidence = candidate.confidence.as_ref(),
        );

        out.push(ModelChange::rename_type(
            old_name,
            new_name,
            candidate.confidence,
            rename_details(old_name, new_name, &candidate, true),
        ));
        used_removed[i] = true;
        used_added[candidate.index] = true;
    }

    out.extend(unused(removed, &used_removed));
    out.extend(unused(added, &used_added));
}

fn pair_relations(
    out: &mut Vec<ModelChange>,
    type_name: &str,
    added: Vec<ModelChange>,
    removed: Vec<ModelChange>,
    thresholds: &RenameThresholds,
) {
    let added_refs: Vec<&ModelChange> = added.iter().collect();
    let mut used_added = vec![false; added.len()];
    let mut used_removed = vec![false; removed.len()];

    for (i, removed_change) in removed.iter().enumerate() {
        let old_name = removed_change.relation();
        let score = |added_change: &ModelChange| (name_similarity(old_name, added_change.relation()), 0.0);

        let Some(candidate) = best_candidate(&added_refs, &used_added, score, thresholds) else {
            continue;
        };
        let new_name = added[candidate.index].relation();

        debug!(
            event = "InferRenames",
            phase = "Relation",
            type_name,
            old = old_name,
            new = new_name,
            name_similarity = candidate.name_similarity,
            confidence = candidate.confidence.as_ref(),
        );

        out.push(ModelChange::rename_relation(
            type_name,
            old_name,
            new_name,
            candidate.confidence,
            rename_details(
                &format!("{type_name}.{old_name}"),
                &format!("{type_name}.{new_name}"),
                &candidate,
                false,
            ),
        ));
        used_removed[i] = true;
        used_added[candidate.index] = true;
    }

    out.extend(unused(removed, &used_removed));
    out.extend(unused(added, &used_added));
}

fn unused(changes: Vec<ModelChange>, used: &[bool]) -> impl Iterator<Item = ModelChange> + '_ {
    changes
        .into_iter()
        .zip(used.iter())
        .filter(|(_, used)| !**used)
        .map(|(change, _)| change)
}
