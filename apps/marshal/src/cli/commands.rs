//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Every
//! command works on a manager already wired by `loader::load_manager`.

use marshal::loader::parse_cli_value;
use marshal_core::{Collection, EntityRef, EntityType, LookupPath, Manager, MarshalError, Related};

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json(output: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(output).unwrap_or_default()
    );
}

/// JSON view of one entity; `verbose` adds lifecycle status and changes.
fn entity_json(entity_type: &EntityType, entity: &EntityRef, verbose: bool) -> serde_json::Value {
    let data = serde_json::to_value(entity.borrow().data()).unwrap_or_default();
    if !verbose {
        return data;
    }
    serde_json::json!({
        "data": data,
        "status": entity_type.status(entity).map(|s| format!("{:?}", s)),
        "changed": serde_json::to_value(entity_type.get_changed_fields(entity)).unwrap_or_default(),
    })
}

fn collection_json(
    entity_type: &EntityType,
    collection: &Collection,
    verbose: bool,
) -> serde_json::Value {
    collection
        .iter()
        .map(|entity| entity_json(entity_type, entity, verbose))
        .collect()
}

fn print_entity(entity_type: &EntityType, entity: &EntityRef, verbose: bool) {
    for (field, value) in entity.borrow().data() {
        println!("  {}: {}", field, value);
    }
    if verbose {
        let status = entity_type
            .status(entity)
            .map_or_else(|| "untracked".to_string(), |s| format!("{:?}", s));
        println!("  (status: {})", status);
    }
}

fn print_collection(entity_type: &EntityType, collection: &Collection, verbose: bool) {
    println!("{} match(es)", collection.len());
    for (position, entity) in collection.iter().enumerate() {
        println!();
        println!("#{}", position + 1);
        print_entity(entity_type, entity, verbose);
    }
}

fn path_name(path: LookupPath) -> &'static str {
    match path {
        LookupPath::Identity => "identity",
        LookupPath::Index => "index",
        LookupPath::Scan => "scan",
    }
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show every registered type.
pub fn cmd_status(manager: &Manager, json_mode: bool) -> Result<(), MarshalError> {
    if json_mode {
        let types: serde_json::Map<String, serde_json::Value> = manager
            .types()
            .map(|t| {
                let relations: Vec<&str> = t.relations().map(|(name, _)| name).collect();
                (
                    t.name().to_string(),
                    serde_json::json!({
                        "identity_field": t.identity_field(),
                        "index_fields": t.index_fields(),
                        "entities": t.count(),
                        "new": t.get_new_entities().len(),
                        "removed": t.get_removed_entities().len(),
                        "changed": t.get_changed_entities().len(),
                        "relations": relations,
                    }),
                )
            })
            .collect();
        print_json(&serde_json::json!({ "types": types }));
        return Ok(());
    }

    println!("Marshal Status");
    println!("==============");
    for t in manager.types() {
        println!();
        println!("{} (identity: {})", t.name(), t.identity_field());
        println!("  Entities: {}", t.count());
        println!("  New:      {}", t.get_new_entities().len());
        println!("  Removed:  {}", t.get_removed_entities().len());
        println!("  Changed:  {}", t.get_changed_entities().len());
        if !t.index_fields().is_empty() {
            println!("  Indexes:  {}", t.index_fields().join(", "));
        }
        for (name, relation) in t.relations() {
            println!(
                "  Relation: {} -> {} ({:?})",
                name,
                relation.foreign_type(),
                relation.relationship()
            );
        }
    }

    Ok(())
}

// =============================================================================
// GET COMMAND
// =============================================================================

/// Show one entity by identity. A missing identity is reported, not an error.
pub fn cmd_get(
    manager: &Manager,
    json_mode: bool,
    verbose: bool,
    type_name: &str,
    id: &str,
) -> Result<(), MarshalError> {
    let entity_type = manager.get_type(type_name)?;
    let entity = entity_type.get_entity(parse_cli_value(id));

    if json_mode {
        let output = serde_json::json!({
            "type": type_name,
            "id": id,
            "found": entity.is_some(),
            "entity": entity.as_ref().map(|e| entity_json(entity_type, e, verbose)),
        });
        print_json(&output);
        return Ok(());
    }

    match entity {
        Some(entity) => {
            println!("{} {}", type_name, id);
            print_entity(entity_type, &entity, verbose);
        }
        None => println!("{} {}: not found", type_name, id),
    }

    Ok(())
}

// =============================================================================
// FIND COMMAND
// =============================================================================

/// Look entities up by field, first match or all of them.
pub fn cmd_find(
    manager: &Manager,
    json_mode: bool,
    verbose: bool,
    type_name: &str,
    field: &str,
    value: &str,
    all: bool,
) -> Result<(), MarshalError> {
    let entity_type = manager.get_type(type_name)?;
    let path = path_name(entity_type.lookup_path(field));
    let target = parse_cli_value(value);

    tracing::debug!("find {}.{} via {} lookup", type_name, field, path);

    if all {
        let collection = entity_type.get_collection_by_field(field, target);
        if json_mode {
            let output = serde_json::json!({
                "type": type_name,
                "field": field,
                "path": path,
                "count": collection.len(),
                "entities": collection_json(entity_type, &collection, verbose),
            });
            print_json(&output);
            return Ok(());
        }
        println!("{}.{} = {} ({} lookup)", type_name, field, value, path);
        print_collection(entity_type, &collection, verbose);
        return Ok(());
    }

    let entity = entity_type.get_entity_by_field(field, target);
    if json_mode {
        let output = serde_json::json!({
            "type": type_name,
            "field": field,
            "path": path,
            "found": entity.is_some(),
            "entity": entity.as_ref().map(|e| entity_json(entity_type, e, verbose)),
        });
        print_json(&output);
        return Ok(());
    }

    println!("{}.{} = {} ({} lookup)", type_name, field, value, path);
    match entity {
        Some(entity) => print_entity(entity_type, &entity, verbose),
        None => println!("  not found"),
    }

    Ok(())
}

// =============================================================================
// RELATED COMMAND
// =============================================================================

/// Resolve a relation for one entity.
pub fn cmd_related(
    manager: &Manager,
    json_mode: bool,
    verbose: bool,
    type_name: &str,
    id: &str,
    relation: &str,
) -> Result<(), MarshalError> {
    let native_type = manager.get_type(type_name)?;
    let foreign_type = manager.get_type(manager.get_relation(type_name, relation)?.foreign_type())?;

    let Some(entity) = native_type.get_entity(parse_cli_value(id)) else {
        if json_mode {
            print_json(&serde_json::json!({
                "type": type_name,
                "id": id,
                "found": false,
            }));
        } else {
            println!("{} {}: not found", type_name, id);
        }
        return Ok(());
    };

    let related = manager.related(type_name, relation, &entity)?;

    if json_mode {
        let result = match &related {
            Related::One(one) => one
                .as_ref()
                .map(|e| entity_json(foreign_type, e, verbose))
                .unwrap_or(serde_json::Value::Null),
            Related::Many(many) => collection_json(foreign_type, many, verbose),
        };
        let output = serde_json::json!({
            "type": type_name,
            "id": id,
            "found": true,
            "relation": relation,
            "foreign_type": foreign_type.name(),
            "related": result,
        });
        print_json(&output);
        return Ok(());
    }

    println!("{} {} -> {} ({})", type_name, id, relation, foreign_type.name());
    match related {
        Related::One(Some(one)) => print_entity(foreign_type, &one, verbose),
        Related::One(None) => println!("  nothing related"),
        Related::Many(many) => print_collection(foreign_type, &many, verbose),
    }

    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Report a successfully wired schema. Wiring errors surface before this runs.
pub fn cmd_validate(manager: &Manager, json_mode: bool) -> Result<(), MarshalError> {
    let types = manager.types().count();
    let relations: usize = manager.types().map(|t| t.relations().count()).sum();
    let entities: usize = manager.types().map(EntityType::count).sum();

    if json_mode {
        print_json(&serde_json::json!({
            "valid": true,
            "types": types,
            "relations": relations,
            "entities": entities,
        }));
        return Ok(());
    }

    println!("Schema OK");
    println!("  Types:     {}", types);
    println!("  Relations: {}", relations);
    println!("  Entities:  {}", entities);

    Ok(())
}
