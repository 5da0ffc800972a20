//! Rust source fragments for each change kind.

use std::fmt::Write;

use crate::types::{ChangeKind, Confidence, ModelChange};

const INDENT: &str = "    ";

/// Writes the body of an `up` or `down` function.
pub(crate) struct BodyWriter {
    out: String,
    calls: usize,
}

/// A rename in one direction.
struct Rename<'a> {
    type_name: &'a str,
    old: &'a str,
    new: &'a str,
    confidence: Confidence,
}

impl BodyWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            calls: 0,
        }
    }

    /// Number of helper calls emitted, commented-out ones excluded.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn comment(&mut self, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                let _ = writeln!(self.out, "{INDENT}//");
            } else {
                let _ = writeln!(self.out, "{INDENT}// {line}");
            }
        }
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    fn call(&mut self, code: &str) {
        let _ = writeln!(self.out, "{INDENT}{code}");
        self.calls += 1;
    }

    fn block(&mut self, lines: &[String]) {
        let _ = writeln!(self.out, "{INDENT}{{");
        for line in lines {
            let _ = writeln!(self.out, "{INDENT}{INDENT}{line}");
        }
        let _ = writeln!(self.out, "{INDENT}}}");
        self.calls += lines.len();
    }

    /// Emit the forward code for one change.
    pub fn forward(&mut self, change: &ModelChange) {
        let type_name = change.type_name.as_str();
        match change.kind {
            ChangeKind::AddType => self.add_type(type_name),
            ChangeKind::RemoveType => self.remove_type(type_name),
            ChangeKind::AddRelation => {
                self.add_relation(type_name, change.relation(), change.new_str())
            }
            ChangeKind::RemoveRelation => self.remove_relation(type_name, change.relation()),
            ChangeKind::UpdateRelation => {
                self.update_relation(type_name, change.relation(), change.new_str())
            }
            ChangeKind::RenameType => self.rename_type(&Rename {
                type_name,
                old: change.old_str(),
                new: change.new_str(),
                confidence: change.confidence(),
            }),
            ChangeKind::RenameRelation => self.rename_relation(&Rename {
                type_name,
                old: change.old_str(),
                new: change.new_str(),
                confidence: change.confidence(),
            }),
        }
        self.blank();
    }

    /// Emit the code undoing one change.
    pub fn backward(&mut self, change: &ModelChange) {
        let type_name = change.type_name.as_str();
        match change.kind {
            ChangeKind::AddType => self.remove_type(type_name),
            ChangeKind::RemoveType => {
                self.comment(&format!(
                    "Cannot automatically restore removed type '{type_name}'.\n\
                     TODO: add type '{type_name}' back with its relations."
                ));
            }
            ChangeKind::AddRelation => self.remove_relation(type_name, change.relation()),
            ChangeKind::RemoveRelation => {
                let relation = change.relation();
                self.comment(&format!(
                    "Cannot automatically restore removed relation '{type_name}.{relation}'.\n\
                     TODO: add relation '{type_name}.{relation}' back. Its tuples were deleted.\n\
                     Previous definition: {}",
                    change.old_str()
                ));
            }
            ChangeKind::UpdateRelation => {
                self.update_relation(type_name, change.relation(), change.old_str())
            }
            ChangeKind::RenameType => self.rename_type(&Rename {
                type_name: change.new_str(),
                old: change.new_str(),
                new: change.old_str(),
                confidence: change.confidence(),
            }),
            ChangeKind::RenameRelation => self.rename_relation(&Rename {
                type_name,
                old: change.new_str(),
                new: change.old_str(),
                confidence: change.confidence(),
            }),
        }
        self.blank();
    }

    fn add_type(&mut self, type_name: &str) {
        self.comment(&format!(
            "Add type: {type_name}\nTODO: define the relations for this type."
        ));
        let _ = writeln!(
            self.out,
            "{INDENT}helpers::add_type_to_model(client, {}, &[",
            lit(type_name)
        );
        let _ = writeln!(self.out, "{INDENT}{INDENT}// (\"owner\", \"[user]\"),");
        self.call("])?;");
    }

    fn remove_type(&mut self, type_name: &str) {
        self.comment(&format!(
            "Remove type: {type_name}\nDelete its tuples first; removing the type keeps them."
        ));
        self.block(&[
            format!(
                "let tuples = helpers::read_all_tuples(client, {}, \"\")?;",
                lit(type_name)
            ),
            "helpers::delete_tuples_in_batches(client, &tuples, BATCH_SIZE)?;".to_string(),
            format!("helpers::remove_type_from_model(client, {})?;", lit(type_name)),
        ]);
    }

    fn add_relation(&mut self, type_name: &str, relation: &str, definition: &str) {
        self.comment(&format!("Add relation: {type_name}.{relation}"));
        self.call(&format!(
            "helpers::add_relation_to_type(client, {}, {}, {})?;",
            lit(type_name),
            lit(relation),
            lit(definition)
        ));
    }

    fn update_relation(&mut self, type_name: &str, relation: &str, definition: &str) {
        self.comment(&format!("Update relation: {type_name}.{relation}"));
        self.call(&format!(
            "helpers::update_relation_definition(client, {}, {}, {})?;",
            lit(type_name),
            lit(relation),
            lit(definition)
        ));
    }

    fn remove_relation(&mut self, type_name: &str, relation: &str) {
        self.comment(&format!("Remove relation: {type_name}.{relation}"));
        self.block(&[
            format!(
                "let tuples = helpers::read_all_tuples(client, {}, {})?;",
                lit(type_name),
                lit(relation)
            ),
            "helpers::delete_tuples_in_batches(client, &tuples, BATCH_SIZE)?;".to_string(),
            format!(
                "helpers::remove_relation_from_type(client, {}, {})?;",
                lit(type_name),
                lit(relation)
            ),
        ]);
    }

    fn rename_type(&mut self, rename: &Rename<'_>) {
        let Rename {
            old,
            new,
            confidence,
            ..
        } = *rename;
        let call = format!("helpers::rename_type(client, {}, {})?;", lit(old), lit(new));

        match confidence {
            Confidence::High => {
                self.comment(&format!(
                    "Rename type: {old} -> {new} (high confidence)\n\
                     Moves every tuple of '{old}' to '{new}'."
                ));
                self.call(&call);
            }
            Confidence::Medium => {
                self.comment(&format!(
                    "REVIEW REQUIRED: possible type rename\n\
                     Detected: {old} -> {new} (medium confidence)\n\
                     \n\
                     This pairing is a similarity guess. Keep the call below if it is a rename;\n\
                     if these are separate types, delete '{old}' and its tuples instead."
                ));
                self.call(&call);
            }
            Confidence::Low | Confidence::None => {
                self.comment(&format!(
                    "MANUAL REVIEW REQUIRED\n\
                     Potential type rename: {old} -> {new} (low confidence)\n\
                     \n\
                     Option 1: if this is a rename, keep the tuples by uncommenting:\n\
                     {call}\n\
                     \n\
                     Option 2 (default): treat them as separate types. '{new}' is already\n\
                     in the new schema; delete '{old}' and its tuples."
                ));
                self.block(&[
                    format!("let tuples = helpers::read_all_tuples(client, {}, \"\")?;", lit(old)),
                    "helpers::delete_tuples_in_batches(client, &tuples, BATCH_SIZE)?;".to_string(),
                    format!("helpers::remove_type_from_model(client, {})?;", lit(old)),
                ]);
            }
        }
    }

    fn rename_relation(&mut self, rename: &Rename<'_>) {
        let Rename {
            type_name,
            old,
            new,
            confidence,
        } = *rename;
        let call = format!(
            "helpers::rename_relation(client, {}, {}, {})?;",
            lit(type_name),
            lit(old),
            lit(new)
        );

        match confidence {
            Confidence::High => {
                self.comment(&format!(
                    "Rename relation: {type_name}.{old} -> {type_name}.{new} (high confidence)\n\
                     Moves every '{old}' tuple to '{new}'."
                ));
                self.call(&call);
            }
            Confidence::Medium => {
                self.comment(&format!(
                    "REVIEW REQUIRED: possible relation rename\n\
                     Detected: {type_name}.{old} -> {type_name}.{new} (medium confidence)\n\
                     \n\
                     This pairing is a similarity guess. Keep the call below if it is a rename;\n\
                     if these are separate relations, delete '{old}' and its tuples instead."
                ));
                self.call(&call);
            }
            Confidence::Low | Confidence::None => {
                self.comment(&format!(
                    "MANUAL REVIEW REQUIRED\n\
                     Potential relation rename: {type_name}.{old} -> {type_name}.{new} (low confidence)\n\
                     \n\
                     Option 1: if this is a rename, keep the tuples by uncommenting:\n\
                     {call}\n\
                     \n\
                     Option 2 (default): treat them as separate relations. '{new}' is already\n\
                     in the new schema; delete '{old}' and its tuples."
                ));
                self.block(&[
                    format!(
                        "let tuples = helpers::read_all_tuples(client, {}, {})?;",
                        lit(type_name),
                        lit(old)
                    ),
                    "helpers::delete_tuples_in_batches(client, &tuples, BATCH_SIZE)?;".to_string(),
                    format!(
                        "helpers::remove_relation_from_type(client, {}, {})?;",
                        lit(type_name),
                        lit(old)
                    ),
                ]);
            }
        }
    }
}

/// A Rust string literal for `value`.
pub(crate) fn lit(value: &str) -> String {
    format!("{value:?}")
}
