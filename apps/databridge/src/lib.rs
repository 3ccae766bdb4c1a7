//! # databridge
//!
//! Library half of the databridge binary: HTTP API, CLI, configuration and
//! the reqwest-backed bulk-data transport. `main.rs` is a thin entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod transport;
