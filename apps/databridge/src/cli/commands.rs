//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Everything except `server` works on the local store directly, without
//! contacting the bulk-data server.

use crate::api::{self, AppState};
use crate::config::{DataBridgeConfig, ServerSection};
use crate::transport::HttpBulkDataTransport;
use databridge_core::{
    BlockStore, BlockType, BridgeError, CircuitBreaker, DataServer, Forwarder, StorageBackend,
    StoredBlock,
};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: DataBridgeConfig) -> Result<(), BridgeError> {
    config.validate()?;

    let store = open_store(&config.server)?;
    let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));
    let transport = HttpBulkDataTransport::new(
        &config.bulk_data.base_url,
        Duration::from_millis(config.bulk_data.timeout_ms),
        tokio::runtime::Handle::current(),
    )?;
    let push_url = transport.push_url().to_string();
    let forwarder = Forwarder::new(transport, config.retry.clone(), Arc::clone(&breaker));
    let server = DataServer::new(Arc::new(store), Arc::new(forwarder));

    println!("databridge Ingestion Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", config.server.host);
    println!("  Port:      {}", config.server.port);
    println!("  Backend:   {}", config.server.backend);
    println!("  Database:  {:?}", config.server.database);
    println!("  Bulk data: {}", push_url);
    println!(
        "  Retry:     {} attempts, {:?}",
        config.retry.max_attempts,
        config.retry.schedule()
    );
    println!(
        "  Breaker:   {} ({}% of >= {} calls)",
        if config.circuit_breaker.enabled {
            "enabled"
        } else {
            "disabled"
        },
        config.circuit_breaker.failure_rate_threshold_percent,
        config.circuit_breaker.minimum_calls
    );
    println!();
    println!("Endpoints:");
    println!("  POST  /dataserver/pushdata");
    println!("  GET   /dataserver/data/{{blockType}}");
    println!("  PATCH /dataserver/update/{{name}}/{{newBlockType}}");
    println!("  GET   /health");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    api::run_server(&addr, AppState::new(server, breaker)).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show block counts per type.
pub fn cmd_status(config: &DataBridgeConfig, json_mode: bool) -> Result<(), BridgeError> {
    let store = open_store(&config.server)?;
    let counts = store.count_by_type()?;
    let total: usize = counts.values().sum();

    if json_mode {
        let by_type: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(t, n)| (t.to_string(), serde_json::json!(n)))
            .collect();
        let output = serde_json::json!({
            "database": config.server.database.to_string_lossy(),
            "backend": config.server.backend,
            "total": total,
            "by_type": by_type,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("databridge Store Status");
    println!("=======================");
    println!("Database: {:?}", config.server.database);
    println!("Backend:  {}", config.server.backend);
    println!();
    for (block_type, count) in &counts {
        println!("{:<12}{}", block_type.as_str(), count);
    }
    println!("{:<12}{}", "TOTAL", total);

    Ok(())
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

/// List stored blocks of a type.
pub fn cmd_query(
    config: &DataBridgeConfig,
    json_mode: bool,
    block_type: &str,
) -> Result<(), BridgeError> {
    let block_type: BlockType = block_type.parse()?;
    let store = open_store(&config.server)?;
    let blocks = store.find_by_type(block_type)?;

    if json_mode {
        let envelopes: Vec<_> = blocks.into_iter().map(StoredBlock::into_envelope).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&envelopes).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{} block(s) of type {}", blocks.len(), block_type);
    for block in &blocks {
        println!("  {} ({} bytes)", block.name, block.data_body.len());
    }
    Ok(())
}

// =============================================================================
// UPDATE COMMAND
// =============================================================================

/// Reclassify a stored block.
pub fn cmd_update(
    config: &DataBridgeConfig,
    json_mode: bool,
    name: &str,
    block_type: &str,
) -> Result<(), BridgeError> {
    let block_type: BlockType = block_type.parse()?;
    let store = open_store(&config.server)?;
    store.update_type(name, block_type)?;

    if json_mode {
        let output = serde_json::json!({ "name": name, "block_type": block_type, "updated": true });
        println!("{}", output);
    } else {
        println!("Updated {} to {}", name, block_type);
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(config: &DataBridgeConfig, force: bool) -> Result<(), BridgeError> {
    let server = &config.server;
    if server.backend == "memory" {
        println!("Memory backend has nothing to initialize");
        return Ok(());
    }

    if server.database.exists() {
        if !force {
            return Err(BridgeError::Configuration(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&server.database)
            .map_err(|e| BridgeError::IoError(format!("Remove db: {}", e)))?;
    }

    open_store(server)?;
    println!("Initialized new redb database at {:?}", server.database);
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the store named by the `[server]` section.
pub fn open_store(server: &ServerSection) -> Result<StorageBackend, BridgeError> {
    match server.backend.as_str() {
        "redb" => StorageBackend::with_redb(&server.database),
        "memory" => Ok(StorageBackend::in_memory()),
        other => Err(BridgeError::Configuration(format!(
            "Unknown backend: {}. Use 'redb' or 'memory'",
            other
        ))),
    }
}
