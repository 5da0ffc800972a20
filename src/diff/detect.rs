use crate::types::{ModelChange, ModelState};

/// Compute the raw differences between two model states.
///
/// Returns added types, removed types, then per shared type the added,
/// removed and updated relations. Renames are never reported here.
pub fn detect_changes(old: &ModelState, new: &ModelState) -> Vec<ModelChange> {
    let mut changes = Vec::new();

    for (name, type_state) in &new.types {
        if !old.types.contains_key(name) {
            changes.push(ModelChange::add_type(name, type_state.relations.len()));
        }
    }

    for name in old.types.keys() {
        if !new.types.contains_key(name) {
            changes.push(ModelChange::remove_type(name));
        }
    }

    for (name, new_type) in &new.types {
        let Some(old_type) = old.types.get(name) else {
            continue;
        };

        for (relation, rule) in &new_type.relations {
            if !old_type.relations.contains_key(relation) {
                changes.push(ModelChange::add_relation(name, relation, rule.to_string()));
            }
        }

        for (relation, old_rule) in &old_type.relations {
            match new_type.relations.get(relation) {
                None => {
                    changes.push(ModelChange::remove_relation(
                        name,
                        relation,
                        old_rule.to_string(),
                    ));
                }
                Some(new_rule) if new_rule != old_rule => {
                    changes.push(ModelChange::update_relation(
                        name,
                        relation,
                        old_rule.to_string(),
                        new_rule.to_string(),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;
    use crate::types::ChangeKind;

    fn state(doc: &str) -> ModelState {
        ModelState::from_model(&parse_document(doc).unwrap())
    }

    const OLD: &str = r#"
type user
type team
  relations
    define member: [user]
type document
  relations
    define owner: [user]
    define viewer: [user] or owner
    define legacy: [user]
"#;

    const NEW: &str = r#"
type user
type folder
  relations
    define owner: [user]
type document
  relations
    define owner: [user]
    define viewer: [user, team#member] or owner
    define editor: owner
"#;

    #[test]
    fn test_identical_states_have_no_changes() {
        assert!(detect_changes(&state(OLD), &state(OLD)).is_empty());
        assert!(detect_changes(&ModelState::default(), &ModelState::default()).is_empty());
    }

    #[test]
    fn test_detect_all_kinds() {
        let changes = detect_changes(&state(OLD), &state(NEW));
        let summary: Vec<String> = changes.iter().map(ToString::to_string).collect();
        assert_eq!(
            summary,
            vec![
                "+ New type 'folder' with 1 relations",
                "- Type 'team' removed",
                "+ Added relation 'document.editor'",
                "- Removed relation 'document.legacy'",
                "~ Updated relation 'document.viewer' definition",
            ]
        );

        let update = changes
            .iter()
            .find(|c| c.kind == ChangeKind::UpdateRelation)
            .unwrap();
        assert_eq!(update.old_str(), "[user] or owner");
        assert_eq!(update.new_str(), "[user, team#member] or owner");
    }

    #[test]
    fn test_everything_added_from_empty() {
        let changes = detect_changes(&ModelState::default(), &state(NEW));
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.kind == ChangeKind::AddType));
    }

    fn doc_with(viewer: &str) -> String {
        format!("type user\ntype doc\n  relations\n    define owner: [user]\n    define viewer: {viewer}\n")
    }

    #[test]
    fn test_added_relation_keeps_every_direct_grant() {
        let old = state("type user\ntype doc\n  relations\n    define owner: [user]\n");
        let changes = detect_changes(&old, &state(&doc_with("[user] or [group#member]")));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::AddRelation);
        assert_eq!(changes[0].new_str(), "[user] or [group#member]");
    }

    #[test]
    fn test_change_in_a_later_direct_grant_is_an_update() {
        let changes = detect_changes(
            &state(&doc_with("[user] but not [bot]")),
            &state(&doc_with("[user] but not [robot]")),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::UpdateRelation);
        assert_eq!(changes[0].old_str(), "[user] but not [bot]");
        assert_eq!(changes[0].new_str(), "[user] but not [robot]");
    }
}
