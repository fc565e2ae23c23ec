//! Store factory
//!
//! Builds the engine's collaborators from configuration.

use crate::adapters::memory::{Dataset, InMemoryStore};
use crate::adapters::storage::traits::Stores;
use crate::config::schema::{OffstudyConfig, StorageBackend};
use crate::domain::Result;
use std::sync::Arc;

/// Create the stores selected by `storage.backend`
///
/// When `storage.seed_path` is set the dataset at that path is loaded first.
///
/// # Errors
///
/// Returns an error if the seed dataset cannot be read or is inconsistent.
pub async fn create_stores(config: &OffstudyConfig) -> Result<Stores> {
    match config.storage.backend {
        StorageBackend::Memory => {
            let store = open_memory_store(config.storage.seed_path.as_deref())?;
            Ok(Stores::from_backend(Arc::new(store)))
        }
    }
}

/// Create the in-memory backend, seeded from `seed_path` if given
pub fn open_memory_store(seed_path: Option<&str>) -> Result<InMemoryStore> {
    match seed_path {
        Some(path) => {
            let dataset = Dataset::from_file(path)?;
            tracing::info!(
                seed_path = %path,
                subjects = dataset.subjects.len(),
                appointments = dataset.appointments.len(),
                "Creating in-memory store from seed dataset"
            );
            InMemoryStore::from_dataset(dataset)
        }
        None => {
            tracing::info!("Creating empty in-memory store");
            Ok(InMemoryStore::new())
        }
    }
}
