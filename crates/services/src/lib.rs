#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod github;
pub mod predicates;
pub mod progression;

pub use gazette_core::Clock;

pub use app_services::AppServices;
pub use config::TutorialConfig;
pub use error::{ApiError, AppServicesError, ConfigError, EngineError};
pub use progression::{
    CheckOutcome, Direction, Driver, Intent, LoginOutcome, NavigationOutcome, Presenter,
    ProgressionEngine,
};
