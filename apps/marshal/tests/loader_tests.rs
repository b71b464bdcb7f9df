//! Integration tests for schema/row loading and manager wiring.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use marshal::loader::{
    build_manager, load_manager, parse_cli_value, parse_data, parse_schema, validate_file_size,
};
use marshal_core::{MarshalError, Relationship, Value};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const SCHEMA: &str = r#"
[types.authors]
identity_field = "id"

[types.posts]
identity_field = "id"
index_fields = ["author_id"]

[types.posts.relations.author]
relationship = "belongs_to"
foreign_type = "authors"
native_field = "author_id"
foreign_field = "id"

[types.posts.relations.tags]
relationship = "has_many_through"
native_field = "id"
foreign_field = "id"
through_type = "posts_tags"
through_native_field = "post_id"
through_foreign_field = "tag_id"

[types.tags]
identity_field = "id"

[types.posts_tags]
identity_field = "id"
index_fields = ["post_id", "tag_id"]
"#;

const DATA: &str = r#"{
    "authors": [
        { "id": 1, "name": "Anna" },
        { "id": 2, "name": "Bo" }
    ],
    "posts": [
        { "id": 1, "author_id": "1", "body": "first", "score": 4.5 },
        { "id": 2, "author_id": "2", "body": "second", "score": null }
    ],
    "tags": [
        { "id": 1, "name": "foo" },
        { "id": 2, "name": "bar" }
    ],
    "posts_tags": [
        { "id": 1, "post_id": 1, "tag_id": 2 },
        { "id": 2, "post_id": 1, "tag_id": 1 }
    ]
}"#;

fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// =============================================================================
// PARSING TESTS
// =============================================================================

#[test]
fn test_parse_schema_keeps_declaration_order() {
    let schema = parse_schema(SCHEMA).unwrap();

    let names: Vec<&str> = schema.types.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["authors", "posts", "tags", "posts_tags"]);

    let posts = &schema.types["posts"];
    assert_eq!(posts.config.index_fields, vec!["author_id"]);
    assert_eq!(
        posts.relations["tags"].relationship,
        Relationship::HasManyThrough
    );
    assert_eq!(
        posts.relations["tags"].through_type.as_deref(),
        Some("posts_tags")
    );
}

#[test]
fn test_parse_schema_rejects_bad_relationship() {
    let bad = r#"
[types.posts]
identity_field = "id"

[types.posts.relations.author]
relationship = "many_to_few"
native_field = "author_id"
foreign_field = "id"
"#;
    assert!(matches!(parse_schema(bad), Err(MarshalError::ConfigError(_))));
}

#[test]
fn test_parse_data_value_kinds() {
    let data = parse_data(DATA).unwrap();

    let posts = &data["posts"];
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["author_id"], Value::from("1"));
    assert_eq!(posts[0]["score"], Value::Float(4.5));
    assert_eq!(posts[1]["score"], Value::Null);

    let fields: Vec<&str> = posts[0].keys().map(String::as_str).collect();
    assert_eq!(fields, vec!["id", "author_id", "body", "score"]);
}

#[test]
fn test_parse_data_rejects_non_array() {
    let result = parse_data(r#"{ "posts": { "id": 1 } }"#);
    assert!(matches!(result, Err(MarshalError::ConfigError(_))));
}

#[test]
fn test_parse_cli_value() {
    assert_eq!(parse_cli_value("42"), Value::Int(42));
    assert_eq!(parse_cli_value("null"), Value::Null);
    assert_eq!(parse_cli_value("\"7\""), Value::from("7"));
    assert_eq!(parse_cli_value("[1, 2]"), Value::from(vec![1, 2]));
    assert_eq!(parse_cli_value("Anna"), Value::from("Anna"));
}

// =============================================================================
// WIRING TESTS
// =============================================================================

#[test]
fn test_build_manager_loads_and_resolves() {
    let schema = parse_schema(SCHEMA).unwrap();
    let manager = build_manager(&schema, parse_data(DATA).unwrap()).unwrap();

    let posts = manager.get_type("posts").unwrap();
    assert_eq!(posts.count(), 2);

    let post = posts.get_entity(1).unwrap();
    let author = manager.related("posts", "author", &post).unwrap();
    assert_eq!(author.entity().unwrap().value("name"), Value::from("Anna"));

    let tags = manager.related("posts", "tags", &post).unwrap();
    assert_eq!(
        tags.into_collection().field_values("name"),
        vec![Value::from("bar"), Value::from("foo")]
    );
}

#[test]
fn test_build_manager_rejects_rows_for_unknown_type() {
    let schema = parse_schema(SCHEMA).unwrap();
    let data = parse_data(r#"{ "comments": [{ "id": 1 }] }"#).unwrap();

    let result = build_manager(&schema, data);
    assert!(matches!(result, Err(MarshalError::UnknownType(name)) if name == "comments"));
}

#[test]
fn test_build_manager_rejects_row_without_identity() {
    let schema = parse_schema(SCHEMA).unwrap();
    let data = parse_data(r#"{ "authors": [{ "name": "Nobody" }] }"#).unwrap();

    let result = build_manager(&schema, data);
    assert!(matches!(
        result,
        Err(MarshalError::MissingIdentityValue { row: 0, .. })
    ));
}

#[test]
fn test_build_manager_rejects_dangling_relation() {
    let schema = parse_schema(
        r#"
[types.posts]
identity_field = "id"

[types.posts.relations.comments]
relationship = "has_many"
native_field = "id"
foreign_field = "post_id"
"#,
    )
    .unwrap();

    // foreign_type defaults to the relation name, which is not registered
    let result = build_manager(&schema, Default::default());
    assert!(matches!(result, Err(MarshalError::UnknownType(name)) if name == "comments"));
}

// =============================================================================
// FILE TESTS
// =============================================================================

#[test]
fn test_load_manager_from_files() {
    let schema = temp_file(SCHEMA);
    let data = temp_file(DATA);

    let manager = load_manager(schema.path(), Some(data.path())).unwrap();
    let names: Vec<&str> = manager.type_names().collect();
    assert_eq!(names, vec!["authors", "posts", "tags", "posts_tags"]);
    assert_eq!(manager.get_type("posts_tags").unwrap().count(), 2);
}

#[test]
fn test_load_manager_without_rows() {
    let schema = temp_file(SCHEMA);

    let manager = load_manager(schema.path(), None).unwrap();
    assert!(manager.types().all(|t| t.is_empty()));
}

#[test]
fn test_load_manager_missing_file() {
    let result = load_manager(Path::new("/definitely/not/here.toml"), None);
    assert!(matches!(result, Err(MarshalError::IoError(_))));
}

#[test]
fn test_load_manager_rejects_directory() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_manager(dir.path(), None);
    assert!(matches!(result, Err(MarshalError::IoError(_))));
}

#[test]
fn test_validate_file_size_limit() {
    let file = temp_file(DATA);
    assert!(validate_file_size(file.path(), 1024 * 1024).is_ok());
    assert!(matches!(
        validate_file_size(file.path(), 8),
        Err(MarshalError::IoError(_))
    ));
}
