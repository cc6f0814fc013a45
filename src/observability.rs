// src/observability.rs
//! Tracing initialization
//!
//! The engine logs through the `tracing` facade and counts through the
//! `metrics` facade; installing subscribers and exporters is the embedding
//! application's choice. This helper covers the common case of a plain
//! fmt subscriber driven by `RUST_LOG`.

use crate::utils::errors::{CaptureError, Result};
use tracing_subscriber::EnvFilter;

/// Initialize a fmt tracing subscriber with env-filter support.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| CaptureError::Configuration(format!("Failed to init tracing: {}", e)))
}
