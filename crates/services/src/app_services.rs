use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::config::TutorialConfig;
use crate::error::AppServicesError;
use crate::github::{GithubApi, GithubClient, RemoteApi};
use crate::progression::{ConnectivityProbe, Driver, Presenter, ProgressionEngine};

/// Assembles the engine and its collaborators for the binary.
pub struct AppServices {
    engine: ProgressionEngine,
    probe: ConnectivityProbe,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the live API.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization, the HTTP client,
    /// or rehydrating the session fails.
    pub async fn new_sqlite(
        db_url: &str,
        config: TutorialConfig,
        presenter: Arc<dyn Presenter>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let remote: Arc<dyn RemoteApi> = Arc::new(GithubClient::new(config.settings.api_base())?);
        Self::assemble(storage, remote, config, presenter, Clock::default()).await
    }

    /// Build services over arbitrary storage and transport.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the session cannot be rehydrated.
    pub async fn assemble(
        storage: Storage,
        remote: Arc<dyn RemoteApi>,
        config: TutorialConfig,
        presenter: Arc<dyn Presenter>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let api = GithubApi::new(remote);
        let engine = ProgressionEngine::load(
            storage.progress_store(),
            api.clone(),
            Arc::clone(&presenter),
            config.settings,
        )
        .await?
        .with_timing(config.timing)
        .with_clock(clock);
        let probe = ConnectivityProbe::new(api, presenter);
        Ok(Self { engine, probe })
    }

    pub fn engine_mut(&mut self) -> &mut ProgressionEngine {
        &mut self.engine
    }

    /// Interactive loop over the engine, with the connectivity probe.
    #[must_use]
    pub fn into_driver(self) -> Driver {
        Driver::new(self.engine).with_probe(self.probe)
    }
}
