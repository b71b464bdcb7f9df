//! # Schema and Row Loading
//!
//! Reads the two input files of the CLI and wires a [`Manager`] from them.
//!
//! - Schema: TOML, one `[types.<name>]` table per type, relations under
//!   `[types.<name>.relations.<relation>]`.
//! - Rows: JSON object mapping type name to an array of row objects.
//!
//! ```json
//! { "authors": [{ "id": 1, "name": "Anna" }],
//!   "posts":   [{ "id": 1, "author_id": 1, "body": "..." }] }
//! ```

use indexmap::IndexMap;
use marshal_core::{Manager, MarshalError, Row, SchemaConfig, Value};
use std::path::{Path, PathBuf};

/// Rows per type name, in file order.
pub type DataSet = IndexMap<String, Vec<Row>>;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum schema file size (1 MB).
pub const MAX_SCHEMA_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum row file size (100 MB).
///
/// Every row is held in memory, so this bounds the identity map as well.
pub const MAX_DATA_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
pub fn validate_file_size(path: &Path, max_size: u64) -> Result<(), MarshalError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| MarshalError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(MarshalError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve a path to an existing regular file.
pub fn validate_file_path(path: &Path) -> Result<PathBuf, MarshalError> {
    let canonical = path.canonicalize().map_err(|e| {
        MarshalError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MarshalError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

fn read_file(path: &Path, max_size: u64) -> Result<String, MarshalError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read_to_string(&validated)
        .map_err(|e| MarshalError::IoError(format!("Read '{}': {}", path.display(), e)))
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse a TOML schema.
pub fn parse_schema(text: &str) -> Result<SchemaConfig, MarshalError> {
    toml::from_str(text).map_err(|e| MarshalError::ConfigError(format!("Schema: {}", e)))
}

/// Parse a JSON row file.
pub fn parse_data(text: &str) -> Result<DataSet, MarshalError> {
    serde_json::from_str(text).map_err(|e| MarshalError::ConfigError(format!("Rows: {}", e)))
}

/// Parse a value given on the command line.
///
/// Anything that parses as JSON (`42`, `null`, `[1,2]`, `"7"`) is taken as
/// that value; everything else is a plain string.
#[must_use]
pub fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw))
}

// =============================================================================
// WIRING
// =============================================================================

/// Register every type and relation of `schema`, then load `data`.
///
/// Rows for a type the schema does not declare are an `UnknownType` error.
pub fn build_manager(schema: &SchemaConfig, data: DataSet) -> Result<Manager, MarshalError> {
    let mut manager = Manager::from_schema(schema)?;
    for (type_name, rows) in data {
        let total = rows.len();
        let inserted = manager.load(&type_name, rows)?;
        tracing::info!(type_name = %type_name, rows = total, inserted, "loaded rows");
    }
    Ok(manager)
}

/// Read a schema file and an optional row file into a wired manager.
pub fn load_manager(schema_path: &Path, data_path: Option<&Path>) -> Result<Manager, MarshalError> {
    tracing::debug!("Reading schema from {:?}", schema_path);
    let schema = parse_schema(&read_file(schema_path, MAX_SCHEMA_FILE_SIZE)?)?;

    let data = match data_path {
        Some(path) => {
            tracing::debug!("Reading rows from {:?}", path);
            parse_data(&read_file(path, MAX_DATA_FILE_SIZE)?)?
        }
        None => DataSet::new(),
    };

    build_manager(&schema, data)
}
