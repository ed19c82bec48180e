//! Remote conditions that confirm each level.
//!
//! Every level maps to one `Predicate` through `PredicateRegistry`. A
//! predicate only reads; what its verdict means for the session is decided
//! by the progression engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gazette_core::Timing;
use gazette_core::model::{
    CapturedReferences, CheckKind, Identity, LevelId, TutorialSettings, levels,
};

use crate::error::ApiError;
use crate::github::GithubApi;

mod fork;
mod issues;
mod pull_request;

pub use fork::{AuthoredCommits, CustomBranch, ForkCreated};
pub use issues::{
    AccountExists, ClosedIssue, IssueCommentCount, IssueCommentEdited, IssueEdited, IssueLabeled,
    IssueSelfAssigned, LicenseFile, OpenPullRequest, WelcomeIssueComment,
};
pub use pull_request::{PullRequestComment, UpstreamPullRequest};

/// Everything a predicate may consult.
#[derive(Clone, Copy)]
pub struct PredicateContext<'a> {
    pub identity: &'a Identity,
    pub references: CapturedReferences,
    pub settings: &'a TutorialSettings,
    pub timing: &'a Timing,
    pub api: &'a GithubApi,
}

/// Outcome of one evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    pub satisfied: bool,
    /// References found along the way, to be persisted on the session.
    pub discovered: Option<CapturedReferences>,
}

impl Verdict {
    #[must_use]
    pub fn satisfied() -> Self {
        Self {
            satisfied: true,
            discovered: None,
        }
    }

    #[must_use]
    pub fn unsatisfied() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn when(satisfied: bool) -> Self {
        Self {
            satisfied,
            discovered: None,
        }
    }

    #[must_use]
    pub fn with_discovered(mut self, refs: CapturedReferences) -> Self {
        self.discovered = Some(refs);
        self
    }
}

#[async_trait]
pub trait Predicate: Send + Sync {
    /// Decide whether the level's remote condition holds.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the remote cannot answer. `NotFound` means
    /// the precondition does not exist yet.
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError>;
}

/// Level to predicate lookup table.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    by_level: HashMap<LevelId, Arc<dyn Predicate>>,
}

impl PredicateRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// One predicate per level in the catalogue.
    #[must_use]
    pub fn standard() -> Self {
        let by_level = levels()
            .iter()
            .map(|spec| (spec.id, for_kind(spec.check)))
            .collect();
        Self { by_level }
    }

    /// Replace the predicate for `level`.
    #[must_use]
    pub fn with(mut self, level: LevelId, predicate: Arc<dyn Predicate>) -> Self {
        self.by_level.insert(level, predicate);
        self
    }

    #[must_use]
    pub fn get(&self, level: LevelId) -> Option<Arc<dyn Predicate>> {
        self.by_level.get(&level).cloned()
    }
}

/// The stock predicate for a check kind.
#[must_use]
pub fn for_kind(kind: CheckKind) -> Arc<dyn Predicate> {
    match kind {
        CheckKind::AccountExists => Arc::new(AccountExists),
        CheckKind::WelcomeIssueComment => Arc::new(WelcomeIssueComment),
        CheckKind::ClosedIssue => Arc::new(ClosedIssue),
        CheckKind::IssueEdited => Arc::new(IssueEdited),
        CheckKind::IssueCommentEdited => Arc::new(IssueCommentEdited),
        CheckKind::IssueCommentCount { min } => Arc::new(IssueCommentCount { min }),
        CheckKind::IssueLabeled => Arc::new(IssueLabeled),
        CheckKind::IssueSelfAssigned => Arc::new(IssueSelfAssigned),
        CheckKind::LicenseFile => Arc::new(LicenseFile),
        CheckKind::OpenPullRequest => Arc::new(OpenPullRequest),
        CheckKind::ForkCreated => Arc::new(ForkCreated),
        CheckKind::AuthoredCommits { min } => Arc::new(AuthoredCommits { min }),
        CheckKind::CustomBranch => Arc::new(CustomBranch),
        CheckKind::UpstreamPullRequest => Arc::new(UpstreamPullRequest),
        CheckKind::PullRequestComment => Arc::new(PullRequestComment),
    }
}

/// True when `updated` is strictly more than `tolerance` after `created`.
#[must_use]
pub fn was_edited(
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    tolerance: Duration,
) -> bool {
    let (Some(created), Some(updated)) = (created, updated) else {
        return false;
    };
    let tolerance_ms = i64::try_from(tolerance.as_millis()).unwrap_or(i64::MAX);
    (updated - created).num_milliseconds() > tolerance_ms
}
