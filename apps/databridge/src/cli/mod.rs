//! # databridge CLI Module
//!
//! This module implements the CLI interface for databridge.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show block counts per type
//! - `query` - List stored blocks of a type
//! - `update` - Reclassify a stored block
//! - `init` - Initialize new database

mod commands;

use crate::config::DataBridgeConfig;
use clap::{Parser, Subcommand};
use databridge_core::BridgeError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// databridge - checksum-verified ingestion server
///
/// Verifies each envelope, persists it, then forwards it to a bulk-data store.
#[derive(Parser, Debug)]
#[command(name = "databridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the block database (overrides [server] database)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

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
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Base URL of the bulk-data server
        #[arg(long)]
        bulk_data_url: Option<String>,
    },

    /// Show block counts per type
    Status,

    /// List stored blocks of a type
    Query {
        /// Block type (BLOCKTYPEA, BLOCKTYPEB)
        #[arg(short = 't', long)]
        block_type: String,
    },

    /// Change the type of a stored block
    Update {
        /// Block name
        #[arg(short, long)]
        name: String,

        /// New block type
        #[arg(short = 't', long)]
        block_type: String,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration from file, environment and global flags.
pub fn resolve_config(cli: &Cli) -> Result<DataBridgeConfig, BridgeError> {
    let mut config = DataBridgeConfig::load(cli.config.as_deref())?;
    config.apply_env();

    if let Some(database) = &cli.database {
        config.server.database = database.clone();
    }
    if let Some(backend) = &cli.backend {
        config.server.backend = backend.clone();
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), BridgeError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server {
            host,
            port,
            bulk_data_url,
        }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(url) = bulk_data_url {
                config.bulk_data.base_url = url;
            }
            cmd_server(config).await
        }
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Query { block_type }) => cmd_query(&config, json_mode, &block_type),
        Some(Commands::Update { name, block_type }) => {
            cmd_update(&config, json_mode, &name, &block_type)
        }
        Some(Commands::Init { force }) => cmd_init(&config, force),
        None => cmd_status(&config, json_mode),
    }
}
