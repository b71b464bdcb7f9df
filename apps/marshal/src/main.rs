//! # Marshal
//!
//! Command-line front end for the marshal-core identity map.
//!
//! Loads a TOML schema and a JSON row file, wires every type and relation,
//! and answers lookups against the result.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/marshal (THE BINARY)          │
//! │                                               │
//! │  ┌─────────────┐        ┌─────────────────┐   │
//! │  │   CLI       │  ───▶  │  loader         │   │
//! │  │  (clap)     │        │  (toml + json)  │   │
//! │  └──────┬──────┘        └────────┬────────┘   │
//! │         └───────────┬────────────┘            │
//! │                     ▼                         │
//! │             ┌───────────────┐                 │
//! │             │ marshal-core  │                 │
//! │             │ (THE LOGIC)   │                 │
//! │             └───────────────┘                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! marshal -s blog.toml -d rows.json status
//! marshal -s blog.toml -d rows.json get --type posts --id 1
//! marshal -s blog.toml -d rows.json find --type posts --field author_id --value 2 --all
//! marshal -s blog.toml -d rows.json related --type posts --id 1 --relation tags
//! marshal -s blog.toml validate
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // MARSHAL_LOG_FORMAT=json switches to machine-parseable logs.
    let log_format = std::env::var("MARSHAL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marshal=info,marshal_core=info".into());

    // Logs go to stderr so stdout stays clean for --json-mode.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Marshal startup banner.
fn print_banner() {
    println!("Marshal v{} - identity map inspector", env!("CARGO_PKG_VERSION"));
    println!();
}
