use super::*;
use crate::memory::InMemoryClient;
use crate::migration::parse_migration_filename;
use crate::types::Confidence;


const VERSION: &str = "20240101120000";

const BASE: &str = r#"
model
  schema 1.1

type user

type team
  relations
    define owner: [user]
    define member: [user] or owner

type document
  relations
    define owner: [user]
    define viewer: [user, team#member] or owner
"#;

fn kinds(changes: &[ModelChange]) -> Vec<String> {
    changes.iter().map(|c| c.kind.to_string()).collect()
}

#[test]
fn test_identical_documents_have_no_changes() {
    let planner = MigrationPlanner::default();
    assert!(planner.diff_documents(BASE, BASE).unwrap().is_empty());

    let err = planner.generate_with_version(&[], "noop", VERSION).unwrap_err();
    assert!(matches!(err, MigrateError::NoChanges));
}

#[test]
fn test_parse_errors_name_the_document() {
    let broken = "type doc\n  relations\n    define viewer: owner or\n";
    let err = diff(BASE, broken).unwrap_err();
    assert!(err.to_string().starts_with("parse desired schema failed for 'new'"));
    assert!(err.parse_kind().is_some());

    let err = diff(broken, BASE).unwrap_err();
    assert!(err.to_string().starts_with("parse current schema failed for 'old'"));
}

#[test]
fn test_update_relation_carries_both_definitions() {
    let new = BASE.replace(
        "define viewer: [user, team#member] or owner",
        "define viewer: [user, team#member] or owner or editor\n    define editor: [user]",
    );
    let changes = diff(BASE, &new).unwrap();
    assert_eq!(kinds(&changes), vec!["update_relation", "add_relation"]);

    let update = &changes[0];
    assert_eq!(update.old_str(), "[user, team#member] or owner");
    assert_eq!(update.new_str(), "[user, team#member] or owner or editor");
    assert_eq!(changes[1].new_str(), "[user]");
}

#[test]
fn test_diff_models_matches_diff_documents() {
    let new = BASE.replace("type user\n", "type user\n\ntype folder\n");
    let planner = MigrationPlanner::default();
    let from_text = planner.diff_documents(BASE, &new).unwrap();
    let from_models = planner.diff_models(
        &crate::parser::parse_document(BASE).unwrap(),
        &crate::parser::parse_document(&new).unwrap(),
    );
    assert_eq!(from_text, from_models);
    assert_eq!(kinds(&from_text), vec!["add_type"]);
}

#[test]
fn test_diff_against_store() {
    let mut client = InMemoryClient::from_dsl(BASE).unwrap();
    let new = BASE.replace(
        "define owner: [user]\n    define member",
        "define owners: [user]\n    define member",
    );
    let changes = MigrationPlanner::default()
        .diff_against_store(&mut client, &new)
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ChangeKind::RenameRelation);
    assert_eq!(changes[0].type_name, "team");
}

#[test]
fn test_write_migration_creates_a_named_file() {
    let dir = tempfile::tempdir().unwrap();
    let changes = vec![ModelChange::remove_type("legacy")];

    let path = MigrationPlanner::default()
        .write_migration(dir.path(), "Drop Legacy", &changes)
        .unwrap();

    let filename = path.file_name().unwrap().to_str().unwrap();
    let (version, name) = parse_migration_filename(filename).unwrap();
    assert_eq!(version.len(), 14);
    assert_eq!(name, "drop_legacy");

    let source = std::fs::read_to_string(&path).unwrap();
    assert!(source.contains("helpers::remove_type_from_model(client, \"legacy\")?;"));
}

#[test]
fn test_failed_generation_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let err = MigrationPlanner::default()
        .write_migration(dir.path(), "empty", &[])
        .unwrap_err();
    assert!(matches!(err, MigrateError::NoChanges));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_describe_changes() {
    assert_eq!(describe_changes(&[]), "No changes detected.");

    let changes = vec![
        ModelChange::add_relation("doc", "viewer", "[user]".into()),
        ModelChange::rename_type("team", "teams", Confidence::High, "renamed".into()),
        ModelChange::remove_type("legacy"),
        ModelChange::rename_relation("doc", "reader", "readers", Confidence::Low, "renamed".into()),
    ];
    assert_eq!(
        describe_changes(&changes),
        "Detected 4 change(s):\n\
         \x20 + Added relation 'doc.viewer'\n\
         \x20 - Type 'legacy' removed\n\
         Inferred renames:\n\
         \x20 → team -> teams [high]\n\
         \x20 → doc.reader -> doc.readers [low]"
    );
}

#[test]
fn test_custom_thresholds_disable_relation_only_renames() {
    let old = "type team\n  relations\n    define owner: [user]\n    define member: [user]\n    define admin: [user]\n";
    let new = old.replace("type team", "type organization");

    let default_changes = diff(old, &new).unwrap();
    assert_eq!(kinds(&default_changes), vec!["rename_type"]);

    let strict = MigrationPlanner::default()
        .with_thresholds(RenameThresholds::default().with_medium(0.30, 1.1).with_low(0.20, 1.1));
    let changes = strict.diff_documents(old, &new).unwrap();
    assert_eq!(kinds(&changes), vec!["remove_type", "add_type"]);
}
