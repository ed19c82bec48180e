use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tracing::{debug, info, warn};

use gazette_core::model::{
    CheckKind, Identity, IdentityError, LevelId, LevelSpec, Session, Stage, TutorialSettings,
    VerifyPage, level,
};
use gazette_core::{Clock, Timing};
use storage::ProgressStore;

use crate::error::{ApiError, EngineError};
use crate::github::GithubApi;
use crate::predicates::{PredicateContext, PredicateRegistry, Verdict};

use super::presenter::{InlineMessage, Presenter, Severity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CheckMode {
    User,
    Recheck,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    SignedIn { display_name: String },
    /// No such account; the player was pointed at the sign-up page.
    UnknownAccount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Confirmed,
    /// First attempt failed; saved as pending and advanced anyway.
    MarkedPending,
    /// A recheck still fails. `pulled_back` is set when the player was
    /// returned to the level.
    StillPending { pulled_back: bool },
    /// A recheck could not reach the remote; the entry stays pending.
    Unavailable,
    /// Recheck of a level that is not pending.
    NotPending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationOutcome {
    Moved(Stage),
    /// "Next" was refused; after the countdown the player was sent to the
    /// first incomplete level.
    Refused { redirected_to: Stage },
    AtBoundary,
}

/// What one background pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecheckReport {
    pub checked: Vec<(LevelId, CheckOutcome)>,
    pub debounced: Vec<LevelId>,
}

/// Owns the session and applies every progression rule to it.
///
/// All mutation goes through `update`, which persists before returning.
/// The engine is driven by one task; methods take `&mut self` and suspend
/// only on remote calls and the redirect countdown.
pub struct ProgressionEngine {
    session: Session,
    store: ProgressStore,
    api: GithubApi,
    presenter: Arc<dyn Presenter>,
    settings: TutorialSettings,
    timing: Timing,
    clock: Clock,
    predicates: PredicateRegistry,
}

impl ProgressionEngine {
    /// Rehydrate the stored session and build an engine around it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if the store cannot be read.
    pub async fn load(
        store: ProgressStore,
        api: GithubApi,
        presenter: Arc<dyn Presenter>,
        settings: TutorialSettings,
    ) -> Result<Self, EngineError> {
        let session = store.load().await?;
        debug!(stage = %session.current(), "session rehydrated");
        Ok(Self {
            session,
            store,
            api,
            presenter,
            settings,
            timing: Timing::default(),
            clock: Clock::default(),
            predicates: PredicateRegistry::standard(),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    #[must_use]
    pub fn with_predicates(mut self, predicates: PredicateRegistry) -> Self {
        self.predicates = predicates;
        self
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn timing(&self) -> Timing {
        self.timing
    }

    #[must_use]
    pub fn presenter(&self) -> Arc<dyn Presenter> {
        Arc::clone(&self.presenter)
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Page the player can open to verify a level by hand.
    #[must_use]
    pub fn verify_url(&self, page: VerifyPage) -> String {
        self.settings
            .verify_url(page, self.session.identity(), self.session.references())
    }

    /// Present the current stage.
    pub fn render(&self) {
        self.presenter
            .render_level(self.session.current(), &self.session);
    }

    /// Apply `change` to the session and persist the result.
    async fn update<R>(
        &mut self,
        change: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, EngineError> {
        let out = change(&mut self.session);
        self.store.save(&self.session).await?;
        Ok(out)
    }

    /// Confirm that `raw` names an existing account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Identity` for a malformed username (no network
    /// call is made), `EngineError::Api` if the lookup cannot be completed,
    /// and `EngineError::Storage` if the session cannot be saved.
    pub async fn login(&mut self, raw: &str) -> Result<LoginOutcome, EngineError> {
        let sign_in = LevelId::SIGN_IN;
        let identity = match Identity::parse(raw) {
            Ok(identity) => identity,
            Err(err) => {
                self.presenter.show_inline_message(
                    sign_in,
                    &InlineMessage::new(Severity::Error, identity_hint(&err)),
                );
                return Err(err.into());
            }
        };

        match self.api.account(&identity).await {
            Ok(account) => {
                let profile = account.into_profile();
                let display_name = profile.display_name.clone();
                info!(%identity, "signed in");
                self.update(|s| s.sign_in(identity, Some(profile))).await?;
                self.presenter.clear_inline_message(sign_in);
                self.render();
                Ok(LoginOutcome::SignedIn { display_name })
            }
            Err(ApiError::NotFound(_)) => {
                info!(%identity, "no such account");
                let message = InlineMessage::new(
                    Severity::Advisory,
                    format!("No account named {identity} yet. Create one, then sign in again."),
                )
                .with_link(self.verify_url(VerifyPage::SignUp));
                self.presenter.show_inline_message(sign_in, &message);
                Ok(LoginOutcome::UnknownAccount)
            }
            Err(err) => {
                warn!(%identity, error = %err, "account lookup failed");
                self.presenter.show_inline_message(
                    sign_in,
                    &InlineMessage::new(
                        Severity::Error,
                        "Could not reach the API to confirm your account. Please try again.",
                    ),
                );
                Err(err.into())
            }
        }
    }

    /// Verify `level` on the player's request.
    ///
    /// A satisfied level is confirmed. Otherwise it is saved as pending and
    /// the player moves on to its unlock target anyway; the background
    /// recheck pulls them back if it keeps failing.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Api` when the remote cannot answer, in which case
    /// nothing about the level changed. Also fails for unknown or locked
    /// levels, before sign-in, and on storage failures.
    pub async fn check(&mut self, level: LevelId) -> Result<CheckOutcome, EngineError> {
        self.run_check(level, CheckMode::User).await
    }

    /// Verify the level currently presented.
    ///
    /// # Errors
    ///
    /// See `check`. Victory stages report `EngineError::NothingToCheck`.
    pub async fn check_current(&mut self) -> Result<CheckOutcome, EngineError> {
        let stage = self.session.current();
        let level = stage
            .level_id()
            .ok_or(EngineError::NothingToCheck(stage))?;
        self.check(level).await
    }

    /// Re-evaluate a pending level in the background.
    ///
    /// # Errors
    ///
    /// Fails only for unknown levels, before sign-in, and on storage
    /// failures. Remote failures leave the level pending.
    pub async fn recheck(&mut self, level: LevelId) -> Result<CheckOutcome, EngineError> {
        self.run_check(level, CheckMode::Recheck).await
    }

    /// One pass over every pending level in insertion order, skipping those
    /// checked within the debounce window.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if a result cannot be saved.
    pub async fn recheck_pending(&mut self) -> Result<RecheckReport, EngineError> {
        let mut report = RecheckReport::default();
        if self.session.identity().is_none() {
            return Ok(report);
        }

        let debounce = TimeDelta::from_std(self.timing.recheck_debounce).unwrap_or(TimeDelta::MAX);
        for level in self.session.pending().levels() {
            let Some(entry) = self.session.pending().get(level) else {
                continue;
            };
            if self.clock.since(entry.last_checked) < debounce {
                debug!(%level, "recheck debounced");
                report.debounced.push(level);
                continue;
            }
            match self.recheck(level).await {
                Ok(outcome) => report.checked.push((level, outcome)),
                Err(EngineError::UnknownLevel(id) | EngineError::NoPredicate(id)) => {
                    warn!(level = %id, "pending entry has no verification rule");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    async fn run_check(
        &mut self,
        id: LevelId,
        mode: CheckMode,
    ) -> Result<CheckOutcome, EngineError> {
        let spec = level(id).ok_or(EngineError::UnknownLevel(id))?;
        let identity = self
            .session
            .identity()
            .cloned()
            .ok_or(EngineError::NotSignedIn)?;

        match mode {
            CheckMode::Recheck if !self.session.is_pending(id) => {
                return Ok(CheckOutcome::NotPending);
            }
            CheckMode::User if spec.stage() > self.session.current() => {
                return Err(EngineError::LevelLocked(id));
            }
            CheckMode::User if self.session.is_completed(id) => {
                self.update(|s| s.advance_to(spec.unlock)).await?;
                self.presenter.clear_inline_message(id);
                self.render();
                return Ok(CheckOutcome::Confirmed);
            }
            _ => {}
        }

        let predicate = self
            .predicates
            .get(id)
            .ok_or(EngineError::NoPredicate(id))?;

        if mode == CheckMode::Recheck {
            let now = self.clock.now();
            self.update(|s| s.mark_pending(id, now)).await?;
        }

        let result = {
            let ctx = PredicateContext {
                identity: &identity,
                references: self.session.references(),
                settings: &self.settings,
                timing: &self.timing,
                api: &self.api,
            };
            predicate.evaluate(&ctx).await
        };

        let verdict = match result {
            Ok(verdict) => verdict,
            Err(err) if err.is_not_found() => {
                debug!(level = %id, error = %err, "precondition not found");
                Verdict::unsatisfied()
            }
            Err(err) => {
                warn!(level = %id, error = %err, "level check failed");
                return match mode {
                    CheckMode::User => {
                        self.presenter.show_inline_message(
                            id,
                            &InlineMessage::new(
                                Severity::Error,
                                "Could not reach the API to check this level. Please try again.",
                            ),
                        );
                        Err(err.into())
                    }
                    CheckMode::Recheck => Ok(CheckOutcome::Unavailable),
                };
            }
        };

        let discovered = verdict.discovered;
        let now = self.clock.now();

        if verdict.satisfied {
            self.update(|s| {
                if let Some(refs) = discovered {
                    s.capture(refs);
                }
                s.mark_completed(id);
                s.advance_to(spec.unlock);
            })
            .await?;
            info!(level = %id, "level confirmed");
            self.presenter.clear_inline_message(id);
            if mode == CheckMode::User {
                self.render();
            }
            return Ok(CheckOutcome::Confirmed);
        }

        match mode {
            CheckMode::Recheck => {
                let pulled_back = self
                    .update(|s| {
                        if let Some(refs) = discovered {
                            s.capture(refs);
                        }
                        s.mark_pending(id, now);
                        s.pull_back_to(id)
                    })
                    .await?;
                if pulled_back {
                    info!(level = %id, "pending level still unmet, pulled back");
                    self.render();
                }
                Ok(CheckOutcome::StillPending { pulled_back })
            }
            CheckMode::User => {
                self.update(|s| {
                    if let Some(refs) = discovered {
                        s.capture(refs);
                    }
                    s.mark_pending(id, now);
                    s.advance_to(spec.unlock);
                })
                .await?;
                info!(level = %id, "level saved as pending");
                let message = InlineMessage::new(
                    Severity::Advisory,
                    format!("Saved as pending. {}", pending_hint(spec)),
                )
                .with_link(self.verify_url(spec.verify_page));
                self.presenter.show_inline_message(id, &message);
                self.render();
                Ok(CheckOutcome::MarkedPending)
            }
        }
    }

    /// Bypass an optional level from its own screen.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotOptional` for required levels,
    /// `EngineError::SkipOutsideLevel` when the level is not the one
    /// presented, and `EngineError::Storage` on save failures.
    pub async fn skip(&mut self, id: LevelId) -> Result<Stage, EngineError> {
        let spec = level(id).ok_or(EngineError::UnknownLevel(id))?;
        if !spec.optional {
            return Err(EngineError::NotOptional(id));
        }
        if self.session.current() != spec.stage() {
            return Err(EngineError::SkipOutsideLevel(id));
        }

        self.update(|s| s.record_skip(id, spec.unlock)).await?;
        info!(level = %id, "optional level skipped");
        self.presenter.clear_inline_message(id);
        self.render();
        Ok(self.session.current())
    }

    /// Skip the level currently presented.
    ///
    /// # Errors
    ///
    /// See `skip`. Victory stages report `EngineError::NothingToCheck`.
    pub async fn skip_current(&mut self) -> Result<Stage, EngineError> {
        let stage = self.session.current();
        let id = stage.level_id().ok_or(EngineError::NothingToCheck(stage))?;
        self.skip(id).await
    }

    /// Move one stage back or forward.
    ///
    /// Going back is always allowed. Going forward from a level requires it
    /// to be completed, pending or the sign-in level; otherwise a
    /// countdown runs and the player lands on the first incomplete level.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if the new position cannot be saved.
    pub async fn navigate(
        &mut self,
        direction: Direction,
    ) -> Result<NavigationOutcome, EngineError> {
        let current = self.session.current();
        let target = match direction {
            Direction::Previous => current.previous(),
            Direction::Next => current.next(),
        };
        let Some(target) = target else {
            return Ok(NavigationOutcome::AtBoundary);
        };

        if direction == Direction::Next && !self.may_leave(current) {
            info!(stage = %current, "forward navigation refused");
            self.count_down().await;
            let redirect = self.session.first_incomplete();
            self.update(|s| s.present(redirect)).await?;
            self.render();
            return Ok(NavigationOutcome::Refused {
                redirected_to: redirect,
            });
        }

        self.update(|s| s.present(target)).await?;
        self.render();
        Ok(NavigationOutcome::Moved(target))
    }

    fn may_leave(&self, stage: Stage) -> bool {
        match stage.level_id() {
            None => true,
            Some(id) => {
                id == LevelId::SIGN_IN
                    || self.session.is_completed(id)
                    || self.session.is_pending(id)
            }
        }
    }

    async fn count_down(&self) {
        for remaining in (1..=self.timing.redirect_countdown_secs).rev() {
            self.presenter.show_blocking_modal(remaining);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.presenter.hide_blocking_modal();
    }

    /// Forget all progress, in storage and in memory.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if the stored record cannot be removed.
    pub async fn reset(&mut self) -> Result<(), EngineError> {
        self.store.clear().await?;
        self.session = Session::new();
        info!("progress reset");
        self.render();
        Ok(())
    }
}

fn identity_hint(err: &IdentityError) -> String {
    match err {
        IdentityError::Empty => "Please enter your username.".to_owned(),
        other => format!("That does not look like a username: {other}."),
    }
}

fn pending_hint(spec: &LevelSpec) -> &'static str {
    match spec.check {
        CheckKind::AccountExists => "Sign in with an existing account.",
        CheckKind::WelcomeIssueComment => "Leave a comment on issue #1.",
        CheckKind::ClosedIssue => {
            "Open an issue with \"Anchor\" or \"Tight\" in the title, then close it."
        }
        CheckKind::IssueEdited => "Edit your issue, then check again.",
        CheckKind::IssueCommentEdited => "Edit one of your own comments on the issue.",
        CheckKind::IssueCommentCount { .. } => {
            "Reopen the issue, leave another comment, and close it again."
        }
        CheckKind::IssueLabeled => "Add a label to your issue.",
        CheckKind::IssueSelfAssigned => "Assign the issue to yourself.",
        CheckKind::LicenseFile => "Add a LICENSE file to the repository.",
        CheckKind::OpenPullRequest => "Open a pull request and leave it open.",
        CheckKind::ForkCreated => "Fork the gazette into your account.",
        CheckKind::AuthoredCommits { .. } => "Commit to your fork.",
        CheckKind::CustomBranch => "Create a branch in your fork, or skip this step.",
        CheckKind::UpstreamPullRequest => "Open a pull request from your fork.",
        CheckKind::PullRequestComment => "Comment on your pull request.",
    }
}
