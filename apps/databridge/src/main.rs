//! # databridge - Ingestion Server
//!
//! The main binary for the databridge ingestion pipeline.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for local store administration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   apps/databridge (THE BINARY)                  │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐    │
//! │  │   CLI       │    │   HTTP API  │    │  HTTP transport  │    │
//! │  │  (clap)     │    │   (axum)    │    │   (reqwest)      │    │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘    │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                  ┌───────────────────┐                          │
//! │                  │  databridge-core  │                          │
//! │                  │   (THE LOGIC)     │                          │
//! │                  └───────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! databridge server --host 0.0.0.0 --port 8090 --bulk-data-url http://bulk:8091
//!
//! # CLI operations
//! databridge status
//! databridge query --block-type BLOCKTYPEA
//! databridge update --name A --block-type BLOCKTYPEB
//! ```

use clap::Parser;
use databridge::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // DATABRIDGE_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("DATABRIDGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "databridge=info,databridge_core=info,tower_http=debug".into()
    });

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  databridge v{}

  Verify • Persist • Forward
"#,
        env!("CARGO_PKG_VERSION")
    );
}
