//! Rendering models back to the DSL.

use std::fmt::Write;

use crate::types::Model;

/// Render a model as a schema document the parser accepts.
pub fn model_to_dsl(model: &Model) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "model");
    let _ = writeln!(out, "  schema {}", model.schema_version);

    for type_def in &model.type_definitions {
        let _ = writeln!(out);
        let _ = writeln!(out, "type {}", type_def.name);
        if type_def.relations.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  relations");
        for relation in &type_def.relations {
            let _ = writeln!(
                out,
                "    define {}: {}",
                relation.name,
                relation.definition()
            );
        }
    }

    out
}
