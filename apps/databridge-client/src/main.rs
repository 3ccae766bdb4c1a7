//! # databridge Client
//!
//! Command-line client for a running databridge server.
//!
//! Reads configuration from environment variables:
//! - `DATABRIDGE_URL`: server URL (default: `http://localhost:8090`)
//! - `DATABRIDGE_API_KEY`: optional Bearer token for authentication
//!
//! ```bash
//! databridge-client push --name A --block-type BLOCKTYPEA --data hello
//! databridge-client get --block-type BLOCKTYPEA
//! databridge-client update --name A --block-type BLOCKTYPEB
//! databridge-client health
//! ```

mod client;

use clap::{Parser, Subcommand};
use client::{ClientError, DataBridgeClient};
use databridge_core::{BlockType, DataBody, DataEnvelope, DataHeader, checksum};

/// databridge client - talk to a databridge server over HTTP
#[derive(Parser, Debug)]
#[command(name = "databridge-client")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server URL (overrides DATABRIDGE_URL)
    #[arg(short, long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push a block; the MD5 checksum is computed from --data
    Push {
        #[arg(short, long)]
        name: String,

        #[arg(short = 't', long, value_parser = parse_block_type)]
        block_type: BlockType,

        /// Block body
        #[arg(short, long)]
        data: String,

        /// Send this checksum instead of the computed one
        #[arg(long)]
        checksum: Option<String>,
    },

    /// List blocks of a type
    Get {
        #[arg(short = 't', long, value_parser = parse_block_type)]
        block_type: BlockType,
    },

    /// Change the type of a stored block
    Update {
        #[arg(short, long)]
        name: String,

        #[arg(short = 't', long, value_parser = parse_block_type)]
        block_type: BlockType,
    },

    /// Server health and circuit breaker state
    Health,
}

fn parse_block_type(s: &str) -> Result<BlockType, String> {
    s.parse().map_err(|e: databridge_core::BridgeError| e.to_string())
}

async fn run(client: &DataBridgeClient, command: Command) -> Result<serde_json::Value, ClientError> {
    match command {
        Command::Push {
            name,
            block_type,
            data,
            checksum: declared,
        } => {
            let declared = declared.unwrap_or_else(|| checksum::digest(data.as_bytes()));
            let envelope = DataEnvelope::new(
                DataHeader::new(name, block_type),
                DataBody::new(data),
                declared,
            );
            client.push(&envelope).await
        }
        Command::Get { block_type } => client.get(block_type).await,
        Command::Update { name, block_type } => client.update(&name, block_type).await,
        Command::Health => client.health().await,
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "databridge_client=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let url = cli
        .url
        .or_else(|| std::env::var("DATABRIDGE_URL").ok())
        .unwrap_or_else(|| "http://localhost:8090".into());
    let api_key = std::env::var("DATABRIDGE_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());

    tracing::debug!("databridge client target: {}", url);
    let client = DataBridgeClient::new(url, api_key);

    match run(&client, cli.command).await {
        Ok(value) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&value).unwrap_or_default()
            );
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
