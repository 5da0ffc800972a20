//! Schema and tuple operations used by migration programs.
//!
//! Schema mutations read the current schema, edit it, and write it back.
//! Schema removals do not touch tuples; pair them with [`delete_relation`] or
//! a read plus [`delete_tuples_batch`].

use tracing::{debug, info};

use crate::config::DEFAULT_BATCH_SIZE;
use crate::error::MigrateError;
use crate::parser::parse_relation;
use crate::traits::SchemaClient;
use crate::types::{Model, Tuple, TupleFilter, TypeDefinition};

pub const BATCH_SIZE: usize = DEFAULT_BATCH_SIZE;

/// Read every tuple of `object_type` with `relation`. Empty strings match all.
pub fn read_all_tuples(
    client: &mut dyn SchemaClient,
    object_type: &str,
    relation: &str,
) -> Result<Vec<Tuple>, MigrateError> {
    client.read_all_tuples(&TupleFilter::new(object_type, relation))
}

pub fn count_tuples(
    client: &mut dyn SchemaClient,
    object_type: &str,
    relation: &str,
) -> Result<usize, MigrateError> {
    Ok(read_all_tuples(client, object_type, relation)?.len())
}

pub fn write_tuples_batch(
    client: &mut dyn SchemaClient,
    tuples: &[Tuple],
) -> Result<(), MigrateError> {
    write_tuples_in_batches(client, tuples, BATCH_SIZE)
}

pub fn delete_tuples_batch(
    client: &mut dyn SchemaClient,
    tuples: &[Tuple],
) -> Result<(), MigrateError> {
    delete_tuples_in_batches(client, tuples, BATCH_SIZE)
}

/// Write `tuples` in chunks of at most `batch_size` (minimum 1).
pub fn write_tuples_in_batches(
    client: &mut dyn SchemaClient,
    tuples: &[Tuple],
    batch_size: usize,
) -> Result<(), MigrateError> {
    for (batch, chunk) in tuples.chunks(batch_size.max(1)).enumerate() {
        client.write_tuples(chunk)?;
        debug!(
            event = "Helpers",
            phase = "WriteBatch",
            batch = batch + 1,
            size = chunk.len()
        );
    }
    Ok(())
}

/// Delete `tuples` in chunks of at most `batch_size` (minimum 1).
pub fn delete_tuples_in_batches(
    client: &mut dyn SchemaClient,
    tuples: &[Tuple],
    batch_size: usize,
) -> Result<(), MigrateError> {
    for (batch, chunk) in tuples.chunks(batch_size.max(1)).enumerate() {
        client.delete_tuples(chunk)?;
        debug!(
            event = "Helpers",
            phase = "DeleteBatch",
            batch = batch + 1,
            size = chunk.len()
        );
    }
    Ok(())
}

/// Every tuple in the store.
pub fn backup_tuples(client: &mut dyn SchemaClient) -> Result<Vec<Tuple>, MigrateError> {
    let tuples = read_all_tuples(client, "", "")?;
    info!(event = "Helpers", phase = "Backup", tuples = tuples.len());
    Ok(tuples)
}

pub fn restore_tuples(client: &mut dyn SchemaClient, tuples: &[Tuple]) -> Result<(), MigrateError> {
    write_tuples_batch(client, tuples)?;
    info!(event = "Helpers", phase = "Restore", tuples = tuples.len());
    Ok(())
}

fn with_model(
    client: &mut dyn SchemaClient,
    edit: impl FnOnce(&mut Model) -> Result<(), MigrateError>,
) -> Result<(), MigrateError> {
    let mut model = client.read_model()?;
    edit(&mut model)?;
    client.write_schema(&model)
}

fn type_mut<'a>(model: &'a mut Model, type_name: &str) -> Result<&'a mut TypeDefinition, MigrateError> {
    model
        .type_definition_mut(type_name)
        .ok_or_else(|| MigrateError::TypeNotFound(type_name.to_string()))
}

/// Add a type with `(name, definition)` relations.
pub fn add_type_to_model(
    client: &mut dyn SchemaClient,
    type_name: &str,
    relations: &[(&str, &str)],
) -> Result<(), MigrateError> {
    let mut type_def = TypeDefinition::new(type_name);
    for (name, definition) in relations {
        let relation = parse_relation(name, definition)
            .map_err(|e| e.context("add type", format!("{type_name}.{name}")))?;
        type_def.insert_relation(relation);
    }

    with_model(client, |model| {
        if model.type_definition(type_name).is_some() {
            return Err(MigrateError::TypeExists(type_name.to_string()));
        }
        model.type_definitions.push(type_def);
        Ok(())
    })?;
    info!(
        event = "Helpers",
        phase = "AddType",
        type_name,
        relations = relations.len()
    );
    Ok(())
}

pub fn remove_type_from_model(
    client: &mut dyn SchemaClient,
    type_name: &str,
) -> Result<(), MigrateError> {
    with_model(client, |model| {
        let before = model.type_definitions.len();
        model.type_definitions.retain(|t| t.name != type_name);
        if model.type_definitions.len() == before {
            return Err(MigrateError::TypeNotFound(type_name.to_string()));
        }
        Ok(())
    })?;
    info!(event = "Helpers", phase = "RemoveType", type_name);
    Ok(())
}

pub fn add_relation_to_type(
    client: &mut dyn SchemaClient,
    type_name: &str,
    relation: &str,
    definition: &str,
) -> Result<(), MigrateError> {
    let parsed = parse_relation(relation, definition)
        .map_err(|e| e.context("add relation", format!("{type_name}.{relation}")))?;
    with_model(client, |model| {
        let type_def = type_mut(model, type_name)?;
        if type_def.relation(relation).is_some() {
            return Err(MigrateError::RelationExists {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
            });
        }
        type_def.insert_relation(parsed);
        Ok(())
    })?;
    info!(event = "Helpers", phase = "AddRelation", type_name, relation);
    Ok(())
}

pub fn remove_relation_from_type(
    client: &mut dyn SchemaClient,
    type_name: &str,
    relation: &str,
) -> Result<(), MigrateError> {
    with_model(client, |model| {
        type_mut(model, type_name)?
            .remove_relation(relation)
            .map(|_| ())
            .ok_or_else(|| MigrateError::RelationNotFound {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
            })
    })?;
    info!(event = "Helpers", phase = "RemoveRelation", type_name, relation);
    Ok(())
}

pub fn update_relation_definition(
    client: &mut dyn SchemaClient,
    type_name: &str,
    relation: &str,
    definition: &str,
) -> Result<(), MigrateError> {
    let parsed = parse_relation(relation, definition)
        .map_err(|e| e.context("update relation", format!("{type_name}.{relation}")))?;
    with_model(client, |model| {
        let type_def = type_mut(model, type_name)?;
        let existing = type_def
            .relation_mut(relation)
            .ok_or_else(|| MigrateError::RelationNotFound {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
            })?;
        *existing = parsed;
        Ok(())
    })?;
    info!(event = "Helpers", phase = "UpdateRelation", type_name, relation);
    Ok(())
}

/// Move every tuple of `old_type` to `new_type` and rename the type in the
/// schema, including `old_type` references in directly-related types.
///
/// If the schema already has `new_type`, `old_type` is dropped from it
/// instead.
pub fn rename_type(
    client: &mut dyn SchemaClient,
    old_type: &str,
    new_type: &str,
) -> Result<(), MigrateError> {
    let tuples = read_all_tuples(client, old_type, "")?;
    let moved: Vec<Tuple> = tuples.iter().map(|t| t.with_object_type(new_type)).collect();
    write_tuples_batch(client, &moved)?;
    delete_tuples_batch(client, &tuples)?;

    with_model(client, |model| {
        let has_new = model.type_definition(new_type).is_some();
        match model.type_definitions.iter().position(|t| t.name == old_type) {
            Some(idx) if has_new => {
                model.type_definitions.remove(idx);
            }
            Some(idx) => model.type_definitions[idx].name = new_type.to_string(),
            None if has_new => {}
            None => return Err(MigrateError::TypeNotFound(old_type.to_string())),
        }

        for relation in model
            .type_definitions
            .iter_mut()
            .flat_map(|t| t.relations.iter_mut())
        {
            relation.rewrite.for_each_direct_mut(&mut |types| {
                for reference in types.iter_mut() {
                    if reference.type_name == old_type {
                        reference.type_name = new_type.to_string();
                    }
                }
            });
        }
        Ok(())
    })?;

    info!(
        event = "Helpers",
        phase = "RenameType",
        old = old_type,
        new = new_type,
        tuples = tuples.len()
    );
    Ok(())
}

/// Move tuples from `old_relation` to `new_relation` on `object_type` and
/// rename the relation in the schema.
///
/// If the schema already has `new_relation`, `old_relation` is dropped from it
/// instead.
pub fn rename_relation(
    client: &mut dyn SchemaClient,
    object_type: &str,
    old_relation: &str,
    new_relation: &str,
) -> Result<(), MigrateError> {
    let tuples = read_all_tuples(client, object_type, old_relation)?;
    let moved: Vec<Tuple> = tuples.iter().map(|t| t.with_relation(new_relation)).collect();
    write_tuples_batch(client, &moved)?;
    delete_tuples_batch(client, &tuples)?;

    with_model(client, |model| {
        let type_def = type_mut(model, object_type)?;
        let has_old = type_def.relation(old_relation).is_some();
        let has_new = type_def.relation(new_relation).is_some();
        match (has_old, has_new) {
            (true, true) => {
                type_def.remove_relation(old_relation);
            }
            (true, false) => {
                if let Some(relation) = type_def.relation_mut(old_relation) {
                    relation.name = new_relation.to_string();
                }
            }
            (false, true) => {}
            (false, false) => {
                return Err(MigrateError::RelationNotFound {
                    type_name: object_type.to_string(),
                    relation: old_relation.to_string(),
                });
            }
        }
        Ok(())
    })?;

    info!(
        event = "Helpers",
        phase = "RenameRelation",
        object_type,
        old = old_relation,
        new = new_relation,
        tuples = tuples.len()
    );
    Ok(())
}

/// Duplicate tuples of `source` onto `target`. The schema is not touched.
pub fn copy_relation(
    client: &mut dyn SchemaClient,
    object_type: &str,
    source: &str,
    target: &str,
) -> Result<usize, MigrateError> {
    let tuples = read_all_tuples(client, object_type, source)?;
    let copies: Vec<Tuple> = tuples.iter().map(|t| t.with_relation(target)).collect();
    write_tuples_batch(client, &copies)?;
    info!(
        event = "Helpers",
        phase = "CopyRelation",
        object_type,
        source,
        target,
        tuples = copies.len()
    );
    Ok(copies.len())
}

/// Delete every tuple of `relation` on `object_type`. The schema is not touched.
pub fn delete_relation(
    client: &mut dyn SchemaClient,
    object_type: &str,
    relation: &str,
) -> Result<usize, MigrateError> {
    let tuples = read_all_tuples(client, object_type, relation)?;
    delete_tuples_batch(client, &tuples)?;
    info!(
        event = "Helpers",
        phase = "DeleteRelation",
        object_type,
        relation,
        tuples = tuples.len()
    );
    Ok(tuples.len())
}

/// Rewrite tuples of `old_relation` through `transform`.
///
/// A non-empty `new_relation` overrides the transformed relation, and when it
/// differs from `old_relation` the originals are deleted.
pub fn migrate_relation_with_transform(
    client: &mut dyn SchemaClient,
    object_type: &str,
    old_relation: &str,
    new_relation: &str,
    transform: impl Fn(&Tuple) -> Result<Tuple, MigrateError>,
) -> Result<usize, MigrateError> {
    let tuples = read_all_tuples(client, object_type, old_relation)?;
    let transformed = tuples
        .iter()
        .map(|tuple| {
            let mut next = transform(tuple).map_err(|e| e.context("transform", tuple.to_string()))?;
            if !new_relation.is_empty() {
                next.relation = new_relation.to_string();
            }
            Ok(next)
        })
        .collect::<Result<Vec<_>, MigrateError>>()?;

    write_tuples_batch(client, &transformed)?;
    if !new_relation.is_empty() && new_relation != old_relation {
        delete_tuples_batch(client, &tuples)?;
    }

    info!(
        event = "Helpers",
        phase = "MigrateWithTransform",
        object_type,
        old = old_relation,
        new = new_relation,
        tuples = transformed.len()
    );
    Ok(transformed.len())
}
