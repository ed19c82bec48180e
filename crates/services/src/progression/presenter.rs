use std::sync::{Arc, Mutex};

use gazette_core::model::{LevelId, Session, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    /// Saved as pending; the player still has something to do.
    Advisory,
    /// Nothing changed; try again later.
    Error,
}

/// Level-scoped message shown beside a level's check button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineMessage {
    pub text: String,
    pub severity: Severity,
    /// Page the player can open to verify by hand.
    pub verify_url: Option<String>,
}

impl InlineMessage {
    #[must_use]
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity,
            verify_url: None,
        }
    }

    #[must_use]
    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.verify_url = Some(url.into());
        self
    }
}

/// Result of the last connectivity probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Online,
    /// The API answered with a failure status, usually rate limiting.
    Degraded(Option<reqwest::StatusCode>),
    Unreachable,
}

/// Rendering seam between the engine and whatever shows the tutorial.
///
/// Calls are fire-and-forget; the engine never waits on the presenter.
pub trait Presenter: Send + Sync {
    fn render_level(&self, stage: Stage, session: &Session);

    fn show_inline_message(&self, level: LevelId, message: &InlineMessage);

    fn clear_inline_message(&self, level: LevelId);

    /// Show or update the navigation guard with the seconds left before the
    /// redirect.
    fn show_blocking_modal(&self, seconds_remaining: u32);

    fn hide_blocking_modal(&self) {}

    fn show_connection_status(&self, _status: ConnectionStatus) {}
}

/// Everything a `RecordingPresenter` was asked to show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenterEvent {
    Rendered(Stage),
    Message(LevelId, InlineMessage),
    Cleared(LevelId),
    Modal(u32),
    ModalHidden,
    Connection(ConnectionStatus),
}

/// Presenter that records calls, for tests and headless runs.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    events: Arc<Mutex<Vec<PresenterEvent>>>,
}

impl RecordingPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<PresenterEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Seconds shown by the blocking modal, in order.
    #[must_use]
    pub fn countdown(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Modal(secs) => Some(secs),
                _ => None,
            })
            .collect()
    }

    /// The most recent message for `level`, unless cleared since.
    #[must_use]
    pub fn message_for(&self, level: LevelId) -> Option<InlineMessage> {
        let mut latest = None;
        for event in self.events() {
            match event {
                PresenterEvent::Message(id, msg) if id == level => latest = Some(msg),
                PresenterEvent::Cleared(id) if id == level => latest = None,
                _ => {}
            }
        }
        latest
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn push(&self, event: PresenterEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Presenter for RecordingPresenter {
    fn render_level(&self, stage: Stage, _session: &Session) {
        self.push(PresenterEvent::Rendered(stage));
    }

    fn show_inline_message(&self, level: LevelId, message: &InlineMessage) {
        self.push(PresenterEvent::Message(level, message.clone()));
    }

    fn clear_inline_message(&self, level: LevelId) {
        self.push(PresenterEvent::Cleared(level));
    }

    fn show_blocking_modal(&self, seconds_remaining: u32) {
        self.push(PresenterEvent::Modal(seconds_remaining));
    }

    fn hide_blocking_modal(&self) {
        self.push(PresenterEvent::ModalHidden);
    }

    fn show_connection_status(&self, status: ConnectionStatus) {
        self.push(PresenterEvent::Connection(status));
    }
}
