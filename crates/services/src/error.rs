//! Shared error types for the services crate.

use thiserror::Error;

use gazette_core::model::{IdentityError, LevelId, SettingsError, Stage};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Classified failures of a remote query.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The resource does not exist (yet).
    #[error("{0} not found")]
    NotFound(String),
    /// Any other non-success status, rate limiting included.
    #[error("{path} returned status {status}")]
    Status {
        status: reqwest::StatusCode,
        path: String,
    },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response payload: {0}")]
    Malformed(String),
}

impl ApiError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Everything except `NotFound` is worth retrying later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !self.is_not_found()
    }
}

/// Errors emitted by `ProgressionEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("sign in before checking levels")]
    NotSignedIn,
    #[error("level {0} does not exist")]
    UnknownLevel(LevelId),
    #[error("there is nothing to check on the {0} screen")]
    NothingToCheck(Stage),
    #[error("level {0} has not been reached yet")]
    LevelLocked(LevelId),
    #[error("level {0} has no verification rule")]
    NoPredicate(LevelId),
    #[error("level {0} is not optional")]
    NotOptional(LevelId),
    #[error("level {0} can only be skipped from its own screen")]
    SkipOutsideLevel(LevelId),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading `TutorialConfig` from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("{var} must be a positive number of seconds, got {raw:?}")]
    InvalidSeconds { var: &'static str, raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
