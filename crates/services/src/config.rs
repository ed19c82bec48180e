use std::env;
use std::time::Duration;

use gazette_core::Timing;
use gazette_core::model::{TutorialSettings, TutorialSettingsDraft};

use crate::error::ConfigError;

pub const ENV_API_BASE: &str = "GAZETTE_API_BASE";
pub const ENV_WEB_BASE: &str = "GAZETTE_WEB_BASE";
pub const ENV_REPO: &str = "GAZETTE_REPO";
pub const ENV_FORK_UPSTREAM: &str = "GAZETTE_FORK_UPSTREAM";
pub const ENV_RECHECK_SECS: &str = "GAZETTE_RECHECK_SECS";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TutorialConfig {
    pub settings: TutorialSettings,
    pub timing: Timing,
}

impl TutorialConfig {
    /// Read settings from `GAZETTE_*` variables, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(TutorialSettingsDraft::default(), None)
    }

    /// Like `from_env`, but values set in `overrides` win over the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a resulting value is invalid.
    pub fn from_env_with(
        overrides: TutorialSettingsDraft,
        recheck_interval: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let env = env_draft();
        let draft = TutorialSettingsDraft {
            api_base: overrides.api_base.or(env.api_base),
            web_base: overrides.web_base.or(env.web_base),
            tutorial_repo: overrides.tutorial_repo.or(env.tutorial_repo),
            fork_upstream: overrides.fork_upstream.or(env.fork_upstream),
        };
        let recheck_interval = match recheck_interval {
            Some(interval) => Some(interval),
            None => env_recheck_interval()?,
        };
        Self::from_draft(draft, recheck_interval)
    }

    /// Validate `draft`, applying an optional recheck interval override.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Settings` if the draft is invalid.
    pub fn from_draft(
        draft: TutorialSettingsDraft,
        recheck_interval: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let settings = draft.validate()?;
        let timing = match recheck_interval {
            Some(interval) => Timing::default().with_recheck_interval(interval),
            None => Timing::default(),
        };
        Ok(Self { settings, timing })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Settings draft populated from the environment.
#[must_use]
pub fn env_draft() -> TutorialSettingsDraft {
    TutorialSettingsDraft {
        api_base: non_empty_var(ENV_API_BASE),
        web_base: non_empty_var(ENV_WEB_BASE),
        tutorial_repo: non_empty_var(ENV_REPO),
        fork_upstream: non_empty_var(ENV_FORK_UPSTREAM),
    }
}

fn env_recheck_interval() -> Result<Option<Duration>, ConfigError> {
    non_empty_var(ENV_RECHECK_SECS)
        .map(|raw| parse_seconds(ENV_RECHECK_SECS, &raw))
        .transpose()
}

/// Parse a positive whole number of seconds.
///
/// # Errors
///
/// Returns `ConfigError::InvalidSeconds` for zero or non-numeric input.
pub fn parse_seconds(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSeconds {
            var,
            raw: raw.to_owned(),
        }),
    }
}
