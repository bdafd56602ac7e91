//! # sitehub-store
//!
//! Clients for the hosted backend and the typed repositories built on them.
//!
//! - [`RestBackend`] talks to the hosted REST gateway, RPC endpoint and
//!   edge functions over HTTP.
//! - [`MemoryBackend`] keeps tables in process and emulates the hosted
//!   database functions; it backs local runs and tests.
//! - [`TableRepository`] maps JSON rows to [`sitehub_entity::Entity`] types.

pub mod functions;
pub mod memory;
pub mod repository;
pub mod rest;

use std::sync::Arc;

use tracing::info;

use sitehub_core::config::backend::BackendConfig;
use sitehub_core::error::AppError;
use sitehub_core::result::AppResult;
use sitehub_core::traits::backend::BackendClient;

pub use memory::MemoryBackend;
pub use repository::TableRepository;
pub use rest::RestBackend;

/// Build the backend client selected by configuration.
pub fn connect(config: &BackendConfig) -> AppResult<Arc<dyn BackendClient>> {
    match config.provider.as_str() {
        "rest" => {
            info!(url = %config.url, "Initializing REST backend client");
            Ok(Arc::new(RestBackend::new(config)?))
        }
        "memory" => {
            info!("Initializing in-memory backend");
            Ok(Arc::new(MemoryBackend::new()))
        }
        other => Err(AppError::configuration(format!(
            "Unknown backend provider: '{other}'. Supported: rest, memory"
        ))),
    }
}
