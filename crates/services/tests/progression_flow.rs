use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use serde_json::json;

use gazette_core::model::{Identity, IdentityError, LevelId, Stage, TutorialSettings};
use gazette_core::time::fixed_clock;
use services::error::{ApiError, EngineError};
use services::github::{ApiQuery, GithubApi, IssueSearch, ScriptedRemote};
use services::predicates::{Predicate, PredicateContext, PredicateRegistry, Verdict};
use services::progression::{
    CheckOutcome, Direction, LoginOutcome, NavigationOutcome, ProgressionEngine,
    RecordingPresenter, Severity,
};
use storage::{InMemoryRepository, PROGRESS_KEY, Storage};

struct Harness {
    engine: ProgressionEngine,
    remote: ScriptedRemote,
    presenter: RecordingPresenter,
    storage: Storage,
}

fn octocat() -> Identity {
    Identity::parse("octocat").unwrap()
}

fn settings() -> TutorialSettings {
    TutorialSettings::default()
}

async fn harness_with(storage: Storage) -> Harness {
    let remote = ScriptedRemote::new();
    remote.respond(
        ApiQuery::user(&octocat()),
        json!({ "login": "octocat", "name": "The Octocat", "followers": 9 }),
    );
    let presenter = RecordingPresenter::new();
    let engine = ProgressionEngine::load(
        storage.progress_store(),
        GithubApi::new(Arc::new(remote.clone())),
        Arc::new(presenter.clone()),
        settings(),
    )
    .await
    .unwrap()
    .with_clock(fixed_clock());
    Harness {
        engine,
        remote,
        presenter,
        storage,
    }
}

async fn harness() -> Harness {
    harness_with(Storage::in_memory()).await
}

/// Harness whose stored progress is `record`.
async fn harness_from(record: &str) -> Harness {
    let storage = Storage {
        progress: Arc::new(InMemoryRepository::with_record(PROGRESS_KEY, record)),
    };
    harness_with(storage).await
}

fn welcome_comments() -> ApiQuery {
    ApiQuery::issue_comments(settings().tutorial_repo(), 1)
}

impl Harness {
    async fn stored(&self) -> gazette_core::model::Session {
        self.storage.progress_store().load().await.unwrap()
    }

    fn advance(&mut self, secs: i64) {
        self.engine.clock_mut().advance(TimeDelta::seconds(secs));
    }
}

#[tokio::test]
async fn login_check_then_recheck_confirms_welcome_comment() {
    let mut h = harness().await;

    let outcome = h.engine.login("octocat").await.unwrap();
    assert_eq!(
        outcome,
        LoginOutcome::SignedIn {
            display_name: "The Octocat".into()
        }
    );
    assert_eq!(h.engine.session().current(), Stage::level(1));
    assert!(h.engine.session().is_completed(LevelId::SIGN_IN));

    h.remote.respond(welcome_comments(), json!([]));
    let outcome = h.engine.check(LevelId::new(1)).await.unwrap();
    assert_eq!(outcome, CheckOutcome::MarkedPending);
    assert_eq!(h.engine.session().pending().levels(), vec![LevelId::new(1)]);
    assert_eq!(h.engine.session().current(), Stage::level(2));

    let message = h.presenter.message_for(LevelId::new(1)).unwrap();
    assert_eq!(message.severity, Severity::Advisory);
    assert_eq!(
        message.verify_url.as_deref(),
        Some("https://github.com/mgifford/learn-github-game/issues/1")
    );

    h.remote
        .respond(welcome_comments(), json!([{ "user": { "login": "octocat" } }]));
    h.advance(45);
    let report = h.engine.recheck_pending().await.unwrap();

    assert_eq!(report.checked, vec![(LevelId::new(1), CheckOutcome::Confirmed)]);
    assert!(h.engine.session().is_completed(LevelId::new(1)));
    assert!(h.engine.session().pending().is_empty());
    assert_eq!(h.engine.session().current(), Stage::level(2));
    assert!(h.presenter.message_for(LevelId::new(1)).is_none());
    assert_eq!(h.stored().await, *h.engine.session());
}

#[tokio::test]
async fn failing_recheck_pulls_back_to_the_level() {
    let mut h = harness().await;
    h.engine.login("octocat").await.unwrap();
    h.engine.check(LevelId::new(1)).await.unwrap();
    h.engine.check(LevelId::new(2)).await.unwrap();
    assert_eq!(h.engine.session().current(), Stage::level(3));

    h.advance(10);
    let report = h.engine.recheck_pending().await.unwrap();

    assert_eq!(
        report.checked,
        vec![
            (LevelId::new(1), CheckOutcome::StillPending { pulled_back: true }),
            (LevelId::new(2), CheckOutcome::StillPending { pulled_back: false }),
        ]
    );
    assert_eq!(h.engine.session().current(), Stage::level(1));
    assert!(h.engine.session().is_pending(LevelId::new(1)));
    assert!(h.engine.session().is_pending(LevelId::new(2)));
    assert_eq!(h.stored().await.current(), Stage::level(1));
}

#[tokio::test]
async fn recently_checked_entries_are_debounced() {
    let mut h = harness().await;
    h.engine.login("octocat").await.unwrap();
    h.engine.check(LevelId::new(1)).await.unwrap();
    let calls = h.remote.call_count();

    h.advance(4);
    let report = h.engine.recheck_pending().await.unwrap();

    assert!(report.checked.is_empty());
    assert_eq!(report.debounced, vec![LevelId::new(1)]);
    assert_eq!(h.remote.call_count(), calls);
}

#[tokio::test]
async fn transport_failure_on_check_changes_nothing() {
    let mut h = harness().await;
    h.engine.login("octocat").await.unwrap();
    let before = h.engine.session().clone();
    h.remote.unreachable(welcome_comments());

    let err = h.engine.check(LevelId::new(1)).await.unwrap_err();

    assert!(matches!(err, EngineError::Api(_)));
    assert_eq!(*h.engine.session(), before);
    let message = h.presenter.message_for(LevelId::new(1)).unwrap();
    assert_eq!(message.severity, Severity::Error);
}

#[tokio::test]
async fn transport_failure_on_recheck_keeps_entry_pending() {
    let mut h = harness().await;
    h.engine.login("octocat").await.unwrap();
    h.engine.check(LevelId::new(1)).await.unwrap();
    h.remote.unreachable(welcome_comments());

    h.advance(45);
    let checked_at = h.engine.session().pending().get(LevelId::new(1)).unwrap().last_checked;
    let outcome = h.engine.recheck(LevelId::new(1)).await.unwrap();

    assert_eq!(outcome, CheckOutcome::Unavailable);
    assert_eq!(h.engine.session().current(), Stage::level(2));
    let entry = h.engine.session().pending().get(LevelId::new(1)).unwrap();
    assert_eq!(entry.last_checked, checked_at + TimeDelta::seconds(45));
}

#[tokio::test]
async fn recheck_of_non_pending_level_is_a_no_op() {
    let mut h = harness().await;
    h.engine.login("octocat").await.unwrap();
    let calls = h.remote.call_count();

    let outcome = h.engine.recheck(LevelId::new(1)).await.unwrap();

    assert_eq!(outcome, CheckOutcome::NotPending);
    assert_eq!(h.remote.call_count(), calls);
}

#[tokio::test(start_paused = true)]
async fn next_from_unfinished_level_counts_down_and_redirects() {
    let mut h = harness_from(
        r#"{"identity":"octocat","current_level":{"level":4},"completed_levels":[0,1,2]}"#,
    )
    .await;
    let started = tokio::time::Instant::now();

    let outcome = h.engine.navigate(Direction::Next).await.unwrap();

    assert_eq!(
        outcome,
        NavigationOutcome::Refused {
            redirected_to: Stage::level(3)
        }
    );
    assert_eq!(h.presenter.countdown(), vec![5, 4, 3, 2, 1]);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(h.engine.session().current(), Stage::level(3));
    assert_eq!(h.stored().await.current(), Stage::level(3));
}

#[tokio::test]
async fn next_is_allowed_from_pending_or_completed_levels() {
    let mut h = harness_from(
        r#"{"identity":"octocat","current_level":{"level":4},"completed_levels":[0,1,2,3],"pending_checks":{"4":{}}}"#,
    )
    .await;

    assert_eq!(
        h.engine.navigate(Direction::Next).await.unwrap(),
        NavigationOutcome::Moved(Stage::level(5))
    );
    assert_eq!(
        h.engine.navigate(Direction::Previous).await.unwrap(),
        NavigationOutcome::Moved(Stage::level(4))
    );
    assert_eq!(
        h.engine.navigate(Direction::Previous).await.unwrap(),
        NavigationOutcome::Moved(Stage::level(3))
    );
    assert_eq!(
        h.engine.navigate(Direction::Next).await.unwrap(),
        NavigationOutcome::Moved(Stage::level(4))
    );
    assert!(h.presenter.countdown().is_empty());
}

#[tokio::test]
async fn navigation_stops_at_the_ends_and_crosses_interim_victory() {
    let mut h = harness().await;
    assert_eq!(
        h.engine.navigate(Direction::Previous).await.unwrap(),
        NavigationOutcome::AtBoundary
    );

    let mut h = harness_from(r#"{"identity":"octocat","current_level":{"level":11}}"#).await;
    assert_eq!(
        h.engine.navigate(Direction::Previous).await.unwrap(),
        NavigationOutcome::Moved(Stage::InterimVictory)
    );
    assert_eq!(
        h.engine.navigate(Direction::Next).await.unwrap(),
        NavigationOutcome::Moved(Stage::level(11))
    );
}

#[tokio::test]
async fn skipping_the_branch_level_advances_without_completion() {
    let mut h = harness_from(
        r#"{"identity":"octocat","current_level":{"level":13},"completed_levels":[0,1,2,3,4,5,6,7,8,9,10,11,12]}"#,
    )
    .await;

    let stage = h.engine.skip(LevelId::new(13)).await.unwrap();

    assert_eq!(stage, Stage::level(14));
    assert!(h.engine.session().skipped().contains(&LevelId::new(13)));
    assert!(!h.engine.session().is_completed(LevelId::new(13)));
    assert_eq!(h.engine.session().first_incomplete(), Stage::level(13));
    assert_eq!(h.stored().await, *h.engine.session());
}

#[tokio::test(start_paused = true)]
async fn skipped_level_is_gated_when_revisited() {
    let mut h = harness_from(
        r#"{"identity":"octocat","current_level":{"level":13},"completed_levels":[0,1,2,3,4,5,6,7,8,9,10,11,12],"skipped_stages":[13]}"#,
    )
    .await;

    let outcome = h.engine.navigate(Direction::Next).await.unwrap();

    assert_eq!(
        outcome,
        NavigationOutcome::Refused {
            redirected_to: Stage::level(13)
        }
    );
    assert_eq!(h.presenter.countdown(), vec![5, 4, 3, 2, 1]);
    assert_eq!(h.engine.session().current(), Stage::level(13));
}

#[tokio::test(start_paused = true)]
async fn redirect_past_a_skip_lands_on_the_skipped_level() {
    let mut h = harness_from(
        r#"{"identity":"octocat","current_level":{"level":14},"completed_levels":[0,1,2,3,4,5,6,7,8,9,10,11,12],"skipped_stages":[13]}"#,
    )
    .await;

    assert_eq!(
        h.engine.navigate(Direction::Next).await.unwrap(),
        NavigationOutcome::Refused {
            redirected_to: Stage::level(13)
        }
    );
}

#[tokio::test]
async fn skip_is_limited_to_the_optional_level_on_screen() {
    let mut h = harness_from(r#"{"identity":"octocat","current_level":{"level":12}}"#).await;

    assert!(matches!(
        h.engine.skip(LevelId::new(12)).await,
        Err(EngineError::NotOptional(_))
    ));
    assert!(matches!(
        h.engine.skip(LevelId::new(13)).await,
        Err(EngineError::SkipOutsideLevel(_))
    ));
    assert_eq!(h.engine.session().current(), Stage::level(12));
}

#[tokio::test]
async fn malformed_username_makes_no_request() {
    let mut h = harness().await;

    let err = h.engine.login("   ").await.unwrap_err();

    assert!(matches!(err, EngineError::Identity(IdentityError::Empty)));
    assert_eq!(h.remote.call_count(), 0);
    assert_eq!(
        h.presenter.message_for(LevelId::SIGN_IN).map(|m| m.severity),
        Some(Severity::Error)
    );
}

#[tokio::test]
async fn unknown_account_points_at_sign_up() {
    let mut h = harness().await;

    let outcome = h.engine.login("ghost-goat").await.unwrap();

    assert_eq!(outcome, LoginOutcome::UnknownAccount);
    assert!(h.engine.session().identity().is_none());
    let message = h.presenter.message_for(LevelId::SIGN_IN).unwrap();
    assert_eq!(message.verify_url.as_deref(), Some("https://github.com/signup"));
}

#[tokio::test]
async fn checks_require_sign_in_and_a_reached_level() {
    let mut h = harness().await;
    assert!(matches!(
        h.engine.check(LevelId::new(1)).await,
        Err(EngineError::NotSignedIn)
    ));

    h.engine.login("octocat").await.unwrap();
    assert!(matches!(
        h.engine.check(LevelId::new(5)).await,
        Err(EngineError::LevelLocked(_))
    ));
    assert!(matches!(
        h.engine.check(LevelId::new(40)).await,
        Err(EngineError::UnknownLevel(_))
    ));
}

#[tokio::test]
async fn rechecking_a_completed_level_needs_no_request() {
    let mut h = harness_from(
        r#"{"identity":"octocat","current_level":{"level":2},"completed_levels":[0,1,2]}"#,
    )
    .await;

    let outcome = h.engine.check(LevelId::new(2)).await.unwrap();

    assert_eq!(outcome, CheckOutcome::Confirmed);
    assert_eq!(h.engine.session().current(), Stage::level(3));
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn upstream_pull_request_number_is_persisted() {
    let mut h = harness_from(r#"{"identity":"octocat","current_level":{"level":15}}"#).await;
    h.remote.respond(
        ApiQuery::search(&IssueSearch::pull_requests(
            settings().fork_upstream(),
            &octocat(),
        )),
        json!({ "total_count": 1, "items": [{ "number": 42 }] }),
    );

    let outcome = h.engine.check(LevelId::new(15)).await.unwrap();

    assert_eq!(outcome, CheckOutcome::Confirmed);
    assert_eq!(h.engine.session().current(), Stage::level(16));
    assert_eq!(h.stored().await.references().pull_request, Some(42));
}

#[tokio::test]
async fn level_ten_unlocks_interim_victory() {
    let mut h = harness_from(r#"{"identity":"octocat","current_level":{"level":10}}"#).await;

    let outcome = h.engine.check(LevelId::new(10)).await.unwrap();

    assert_eq!(outcome, CheckOutcome::MarkedPending);
    assert_eq!(h.engine.session().current(), Stage::InterimVictory);
    assert!(matches!(
        h.engine.check_current().await,
        Err(EngineError::NothingToCheck(Stage::InterimVictory))
    ));
}

#[tokio::test]
async fn reset_forgets_everything() {
    let mut h = harness().await;
    h.engine.login("octocat").await.unwrap();

    h.engine.reset().await.unwrap();

    assert!(h.engine.session().identity().is_none());
    assert_eq!(h.engine.session().current(), Stage::FIRST);
    assert_eq!(h.stored().await, *h.engine.session());
}

struct AlwaysMet;

#[async_trait]
impl Predicate for AlwaysMet {
    async fn evaluate(&self, _ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        Ok(Verdict::satisfied())
    }
}

#[tokio::test]
async fn checks_dispatch_through_the_installed_registry() {
    let h = harness_from(
        r#"{"identity":"octocat","current_level":{"level":2},"completed_levels":[0]}"#,
    )
    .await;
    let registry = PredicateRegistry::empty().with(LevelId::new(1), Arc::new(AlwaysMet));
    let mut engine = h.engine.with_predicates(registry);

    assert_eq!(engine.check(LevelId::new(1)).await.unwrap(), CheckOutcome::Confirmed);
    assert!(engine.session().is_completed(LevelId::new(1)));
    assert_eq!(h.remote.call_count(), 0);

    assert!(matches!(
        engine.check(LevelId::new(2)).await,
        Err(EngineError::NoPredicate(_))
    ));
}
