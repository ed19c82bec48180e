use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::progress::ProgressStore;

/// Fixed key the progress record lives under.
pub const PROGRESS_KEY: &str = "git_goat_game_state";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable key-value slots holding serialized records.
///
/// Payloads are opaque here; `ProgressStore` owns the encoding.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Read the payload stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the payload stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be stored.
    async fn write(&self, key: &str, payload: &str) -> Result<(), StorageError>;

    /// Delete the payload stored under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the delete.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-seeded with a raw payload, e.g. one written by an older build.
    #[must_use]
    pub fn with_record(key: &str, payload: &str) -> Self {
        let repo = Self::new();
        if let Ok(mut guard) = repo.records.lock() {
            guard.insert(key.to_owned(), payload.to_owned());
        }
        repo
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn write(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), payload.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            progress: Arc::new(InMemoryRepository::new()),
        }
    }

    /// Session-level view over the progress repository.
    #[must_use]
    pub fn progress_store(&self) -> ProgressStore {
        ProgressStore::new(Arc::clone(&self.progress))
    }
}
