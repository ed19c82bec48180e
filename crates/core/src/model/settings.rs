use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::model::{CapturedReferences, Identity, VerifyPage};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_WEB_BASE: &str = "https://github.com";
pub const DEFAULT_TUTORIAL_REPO: &str = "mgifford/learn-github-game";
pub const DEFAULT_FORK_UPSTREAM: &str = "CivicActions/git-goat-gazette";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("repository must look like owner/name: {0}")]
    InvalidRepository(String),
}

/// `owner/name` of a repository on the hosting service.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    owner: String,
    name: String,
}

impl RepoSlug {
    /// The same repository name under another account (the player's fork).
    #[must_use]
    pub fn under(&self, owner: &Identity) -> Self {
        Self {
            owner: owner.as_str().to_owned(),
            name: self.name.clone(),
        }
    }

    /// Case-insensitive match against a `full_name` reported by the API.
    #[must_use]
    pub fn matches_full_name(&self, full_name: &str) -> bool {
        full_name.eq_ignore_ascii_case(&self.to_string())
    }
}

impl FromStr for RepoSlug {
    type Err = SettingsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || SettingsError::InvalidRepository(raw.to_owned());
        let (owner, name) = raw.trim().split_once('/').ok_or_else(invalid)?;
        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid_part(owner) || !valid_part(name) {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Where the tutorial points: the API to query and the repositories the
/// levels refer to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TutorialSettings {
    api_base: String,
    web_base: String,
    tutorial_repo: RepoSlug,
    fork_upstream: RepoSlug,
}

#[derive(Clone, Debug, Default)]
pub struct TutorialSettingsDraft {
    pub api_base: Option<String>,
    pub web_base: Option<String>,
    pub tutorial_repo: Option<String>,
    pub fork_upstream: Option<String>,
}

impl TutorialSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset values with the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a base URL does not parse or a repository
    /// is not `owner/name`.
    pub fn validate(self) -> Result<TutorialSettings, SettingsError> {
        let api_base = base_url(self.api_base, DEFAULT_API_BASE)?;
        let web_base = base_url(self.web_base, DEFAULT_WEB_BASE)?;
        let tutorial_repo = normalize_optional(self.tutorial_repo)
            .as_deref()
            .unwrap_or(DEFAULT_TUTORIAL_REPO)
            .parse()?;
        let fork_upstream = normalize_optional(self.fork_upstream)
            .as_deref()
            .unwrap_or(DEFAULT_FORK_UPSTREAM)
            .parse()?;

        Ok(TutorialSettings {
            api_base,
            web_base,
            tutorial_repo,
            fork_upstream,
        })
    }
}

impl TutorialSettings {
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    #[must_use]
    pub fn web_base(&self) -> &str {
        &self.web_base
    }

    #[must_use]
    pub fn tutorial_repo(&self) -> &RepoSlug {
        &self.tutorial_repo
    }

    #[must_use]
    pub fn fork_upstream(&self) -> &RepoSlug {
        &self.fork_upstream
    }

    /// The repository the player is expected to fork into their account.
    #[must_use]
    pub fn fork_of(&self, identity: &Identity) -> RepoSlug {
        self.fork_upstream.under(identity)
    }

    /// Link a player can open to verify a level by hand.
    #[must_use]
    pub fn verify_url(
        &self,
        page: VerifyPage,
        identity: Option<&Identity>,
        refs: CapturedReferences,
    ) -> String {
        let web = &self.web_base;
        let tutorial = &self.tutorial_repo;
        let upstream = &self.fork_upstream;
        let fork = |suffix: &str| match identity {
            Some(id) => format!("{web}/{}{suffix}", self.fork_of(id)),
            None => format!("{web}/{upstream}/fork"),
        };

        match page {
            VerifyPage::SignUp => format!("{web}/signup"),
            VerifyPage::WelcomeIssue => format!("{web}/{tutorial}/issues/1"),
            VerifyPage::TutorialIssues => format!("{web}/{tutorial}/issues"),
            VerifyPage::TutorialPulls => format!("{web}/{tutorial}/pulls"),
            VerifyPage::TutorialLicense => format!("{web}/{tutorial}/blob/main/LICENSE"),
            VerifyPage::Fork => fork(""),
            VerifyPage::ForkCommits => fork("/commits"),
            VerifyPage::ForkBranches => fork("/branches"),
            VerifyPage::UpstreamPulls => format!("{web}/{upstream}/pulls"),
            VerifyPage::PullRequest => match refs.pull_request {
                Some(number) => format!("{web}/{upstream}/pull/{number}"),
                None => format!("{web}/{upstream}/pulls"),
            },
        }
    }
}

impl Default for TutorialSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            web_base: DEFAULT_WEB_BASE.to_owned(),
            tutorial_repo: RepoSlug {
                owner: "mgifford".to_owned(),
                name: "learn-github-game".to_owned(),
            },
            fork_upstream: RepoSlug {
                owner: "CivicActions".to_owned(),
                name: "git-goat-gazette".to_owned(),
            },
        }
    }
}

fn base_url(raw: Option<String>, default: &str) -> Result<String, SettingsError> {
    let Some(value) = normalize_optional(raw) else {
        return Ok(default.to_owned());
    };
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Ok(value.trim_end_matches('/').to_owned())
        }
        _ => Err(SettingsError::InvalidBaseUrl(value)),
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_matches_defaults() {
        let settings = TutorialSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, TutorialSettings::default());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let settings = TutorialSettingsDraft {
            api_base: Some("http://127.0.0.1:9000/".into()),
            ..TutorialSettingsDraft::default()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.api_base(), "http://127.0.0.1:9000");
    }

    #[test]
    fn rejects_bad_values() {
        let bad_url = TutorialSettingsDraft {
            api_base: Some("not a url".into()),
            ..TutorialSettingsDraft::default()
        };
        assert!(matches!(
            bad_url.validate(),
            Err(SettingsError::InvalidBaseUrl(_))
        ));

        assert!("no-slash".parse::<RepoSlug>().is_err());
        assert!("owner/".parse::<RepoSlug>().is_err());
        assert!("a/b/c".parse::<RepoSlug>().is_err());
    }

    #[test]
    fn fork_lives_under_the_player() {
        let settings = TutorialSettings::default();
        let id = Identity::parse("octocat").unwrap();
        assert_eq!(settings.fork_of(&id).to_string(), "octocat/git-goat-gazette");
        assert!(settings
            .fork_upstream()
            .matches_full_name("civicactions/Git-Goat-Gazette"));
    }

    #[test]
    fn verify_links_use_captured_pull_request() {
        let settings = TutorialSettings::default();
        let refs = CapturedReferences {
            pull_request: Some(12),
        };
        assert_eq!(
            settings.verify_url(VerifyPage::PullRequest, None, refs),
            "https://github.com/CivicActions/git-goat-gazette/pull/12"
        );
        assert_eq!(
            settings.verify_url(VerifyPage::WelcomeIssue, None, CapturedReferences::default()),
            "https://github.com/mgifford/learn-github-game/issues/1"
        );
    }
}
