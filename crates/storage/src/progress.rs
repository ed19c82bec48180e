use std::sync::Arc;

use gazette_core::model::{Session, SessionRepair};
use tracing::{debug, warn};

use crate::repository::{PROGRESS_KEY, ProgressRepository, StorageError};

/// Reads and writes the session record under the fixed progress key.
#[derive(Clone)]
pub struct ProgressStore {
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(repo: Arc<dyn ProgressRepository>) -> Self {
        Self { repo }
    }

    /// Rehydrate the stored session.
    ///
    /// A missing record yields a fresh session. So does a record that no
    /// longer parses; it is logged and will be overwritten by the next save.
    /// Parsed records are repaired before they are returned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load(&self) -> Result<Session, StorageError> {
        let Some(raw) = self.repo.read(PROGRESS_KEY).await? else {
            debug!("no stored progress, starting fresh");
            return Ok(Session::new());
        };

        let mut session = match decode(&raw) {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "stored progress is unreadable, starting fresh");
                return Ok(Session::new());
            }
        };

        for repair in session.repair() {
            match repair {
                SessionRepair::StageOutOfRange => {
                    warn!("stored stage is out of range, resetting to level 0");
                }
                SessionRepair::UnknownLevelDropped(level) => {
                    warn!(%level, "dropping unknown level from stored progress");
                }
                SessionRepair::ConfirmedPendingCleared(level) => {
                    warn!(%level, "clearing pending entry for a completed level");
                }
            }
        }

        Ok(session)
    }

    /// Persist the session, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, session: &Session) -> Result<(), StorageError> {
        let payload = encode(session)?;
        self.repo.write(PROGRESS_KEY, &payload).await
    }

    /// Delete the stored record (operator reset).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the delete.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.repo.remove(PROGRESS_KEY).await
    }
}

/// Serialize a session into the stored JSON record.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode(session: &Session) -> Result<String, StorageError> {
    serde_json::to_string(session).map_err(|err| StorageError::Serialization(err.to_string()))
}

/// Parse a stored JSON record. Absent fields take their defaults.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the payload is not a session record.
pub fn decode(raw: &str) -> Result<Session, StorageError> {
    serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use gazette_core::model::{CapturedReferences, Identity, LevelId, Profile, Stage};
    use gazette_core::time::fixed_now;

    fn store_with(payload: &str) -> ProgressStore {
        ProgressStore::new(Arc::new(InMemoryRepository::with_record(
            PROGRESS_KEY,
            payload,
        )))
    }

    #[tokio::test]
    async fn save_then_load_is_equivalent() {
        let store = ProgressStore::new(Arc::new(InMemoryRepository::new()));
        let mut session = Session::new();
        session.sign_in(
            Identity::parse("octocat").unwrap(),
            Some(Profile {
                display_name: "The Octocat".into(),
                followers: 9,
                public_repos: 8,
                ..Profile::default()
            }),
        );
        session.mark_pending(LevelId::new(1), fixed_now());
        session.advance_to(Stage::level(2));
        session.capture(CapturedReferences {
            pull_request: Some(7),
        });

        store.save(&session).await.unwrap();
        let restored = store.load().await.unwrap();

        assert_eq!(restored, session);
    }

    #[tokio::test]
    async fn empty_store_yields_fresh_session() {
        let store = ProgressStore::new(Arc::new(InMemoryRepository::new()));
        assert_eq!(store.load().await.unwrap(), Session::new());
    }

    #[tokio::test]
    async fn garbage_record_yields_fresh_session() {
        let store = store_with("{not json");
        assert_eq!(store.load().await.unwrap(), Session::new());
    }

    #[tokio::test]
    async fn sparse_record_is_defaulted_and_repaired() {
        let store = store_with(
            r#"{"identity":"octocat","completed_levels":[0,1],"pending_checks":{"1":{}}}"#,
        );
        let session = store.load().await.unwrap();
        assert_eq!(session.identity().map(Identity::as_str), Some("octocat"));
        assert!(session.pending().is_empty());
        assert_eq!(session.current(), Stage::FIRST);
    }

    #[tokio::test]
    async fn clear_removes_the_record() {
        let store = store_with("{}");
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), Session::new());
    }
}
