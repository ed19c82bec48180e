use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use gazette_core::model::LevelId;

use crate::error::EngineError;

use super::connectivity::ConnectivityProbe;
use super::engine::{Direction, ProgressionEngine};
use super::presenter::{InlineMessage, Severity};

/// Something the player asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Login(String),
    Check(LevelId),
    CheckCurrent,
    Skip(LevelId),
    SkipCurrent,
    Navigate(Direction),
    Reset,
    Quit,
}

/// Single-task loop multiplexing intents, the pending recheck interval and
/// the connectivity interval. Both intervals fire once at start-up.
pub struct Driver {
    engine: ProgressionEngine,
    probe: Option<ConnectivityProbe>,
}

impl Driver {
    #[must_use]
    pub fn new(engine: ProgressionEngine) -> Self {
        Self {
            engine,
            probe: None,
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: ConnectivityProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Run until `Quit` arrives or every sender is dropped, then hand the
    /// engine back.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if progress can no longer be saved.
    /// Every other failure is reported to the presenter and the loop goes on.
    pub async fn run(
        mut self,
        mut intents: mpsc::Receiver<Intent>,
    ) -> Result<ProgressionEngine, EngineError> {
        let timing = self.engine.timing();
        let mut recheck = interval(timing.pending_recheck_interval);
        recheck.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut connectivity = interval(timing.connectivity_interval);
        connectivity.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.engine.render();
        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    None | Some(Intent::Quit) => break,
                    Some(intent) => self.handle(intent).await?,
                },
                _ = recheck.tick() => {
                    let report = self.engine.recheck_pending().await?;
                    debug!(
                        checked = report.checked.len(),
                        debounced = report.debounced.len(),
                        "recheck pass"
                    );
                }
                _ = connectivity.tick(), if self.probe.is_some() => {
                    if let Some(probe) = self.probe.as_mut() {
                        probe.probe().await;
                    }
                }
            }
        }
        Ok(self.engine)
    }

    async fn handle(&mut self, intent: Intent) -> Result<(), EngineError> {
        debug!(?intent, "intent");
        let result = match intent {
            Intent::Login(name) => self.engine.login(&name).await.map(|_| ()),
            Intent::Check(level) => self.engine.check(level).await.map(|_| ()),
            Intent::CheckCurrent => self.engine.check_current().await.map(|_| ()),
            Intent::Skip(level) => self.engine.skip(level).await.map(|_| ()),
            Intent::SkipCurrent => self.engine.skip_current().await.map(|_| ()),
            Intent::Navigate(direction) => self.engine.navigate(direction).await.map(|_| ()),
            Intent::Reset => self.engine.reset().await,
            Intent::Quit => Ok(()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(err @ EngineError::Storage(_)) => Err(err),
            // Already shown inline by the engine.
            Err(EngineError::Api(_) | EngineError::Identity(_)) => Ok(()),
            Err(err) => {
                warn!(error = %err, "intent rejected");
                if let Some(level) = self.engine.session().current().level_id() {
                    self.engine.presenter().show_inline_message(
                        level,
                        &InlineMessage::new(Severity::Info, err.to_string()),
                    );
                }
                Ok(())
            }
        }
    }
}
