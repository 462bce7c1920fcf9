//! Persistent job store.
//!
//! This crate provides:
//! - The `JobStore` capability: create, read and conditionally update a job
//! - An in-memory store for tests and local development
//! - A PostgREST (Supabase) adapter for the `processing_jobs` table

pub mod config;
pub mod error;
pub mod memory;
pub mod postgrest;
pub mod store;

use std::sync::Arc;

pub use config::{StoreBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryJobStore;
pub use postgrest::PostgrestJobStore;
pub use store::JobStore;

/// Build the store selected by `config`.
pub fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn JobStore>> {
    match &config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory job store; jobs are lost on restart");
            Ok(Arc::new(MemoryJobStore::new()))
        }
        StoreBackend::Postgrest { .. } => Ok(Arc::new(PostgrestJobStore::new(config.clone())?)),
    }
}
