//! Level progression: the engine that owns the session, the presenter seam,
//! and the loop that drives both.

mod connectivity;
mod driver;
mod engine;
mod presenter;

pub use connectivity::ConnectivityProbe;
pub use driver::{Driver, Intent};
pub use engine::{
    CheckOutcome, Direction, LoginOutcome, NavigationOutcome, ProgressionEngine, RecheckReport,
};
pub use presenter::{
    ConnectionStatus, InlineMessage, Presenter, PresenterEvent, RecordingPresenter, Severity,
};
