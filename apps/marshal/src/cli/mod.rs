//! # Marshal CLI Module
//!
//! This module implements the CLI interface for Marshal.
//!
//! ## Available Commands
//!
//! - `status` - Show every type with its counts, indexes and relations
//! - `get` - Show one entity by identity
//! - `find` - Look entities up by field
//! - `related` - Resolve a relation for one entity
//! - `validate` - Wire the schema and rows, report errors

mod commands;

use clap::{Parser, Subcommand};
use marshal::loader;
use marshal_core::MarshalError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Marshal - identity map inspector
///
/// Loads rows into per-type identity maps and resolves relations between
/// them, as declared by a schema.
#[derive(Parser, Debug)]
#[command(name = "marshal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show lifecycle status and changed fields with each entity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML schema
    #[arg(short, long, global = true, default_value = "marshal.toml")]
    pub schema: PathBuf,

    /// Path to the JSON row file
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every registered type
    Status,

    /// Show one entity by identity
    Get {
        /// Type name
        #[arg(short, long = "type")]
        type_name: String,

        /// Identity value (parsed as JSON, else taken as a string)
        #[arg(short, long)]
        id: String,
    },

    /// Look entities up by field value
    Find {
        /// Type name
        #[arg(short, long = "type")]
        type_name: String,

        /// Field to match
        #[arg(short, long)]
        field: String,

        /// Value to match (a JSON array matches any of its items)
        #[arg(short = 'V', long)]
        value: String,

        /// Return every match instead of the first
        #[arg(short, long)]
        all: bool,
    },

    /// Resolve a relation for one entity
    Related {
        /// Native type name
        #[arg(short, long = "type")]
        type_name: String,

        /// Identity of the native entity
        #[arg(short, long)]
        id: String,

        /// Relation name
        #[arg(short, long)]
        relation: String,
    },

    /// Check that the schema and rows wire up
    Validate,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), MarshalError> {
    let manager = loader::load_manager(&cli.schema, cli.data.as_deref())?;
    let json_mode = cli.json_mode;
    let verbose = cli.verbose;

    match cli.command {
        Some(Commands::Status) => cmd_status(&manager, json_mode),
        Some(Commands::Get { type_name, id }) => {
            cmd_get(&manager, json_mode, verbose, &type_name, &id)
        }
        Some(Commands::Find {
            type_name,
            field,
            value,
            all,
        }) => cmd_find(&manager, json_mode, verbose, &type_name, &field, &value, all),
        Some(Commands::Related {
            type_name,
            id,
            relation,
        }) => cmd_related(&manager, json_mode, verbose, &type_name, &id, &relation),
        Some(Commands::Validate) => cmd_validate(&manager, json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&manager, json_mode)
        }
    }
}
