#![forbid(unsafe_code)]

pub mod progress;
pub mod repository;
pub mod sqlite;

pub use progress::ProgressStore;
pub use repository::{InMemoryRepository, PROGRESS_KEY, ProgressRepository, Storage, StorageError};
