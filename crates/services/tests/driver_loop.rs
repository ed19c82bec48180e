use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use gazette_core::model::{Identity, LevelId, Stage, TutorialSettings};
use gazette_core::time::fixed_clock;
use services::github::{ApiQuery, GithubApi, ScriptedRemote};
use services::progression::{
    ConnectionStatus, ConnectivityProbe, Driver, Intent, PresenterEvent, ProgressionEngine,
    RecordingPresenter,
};
use storage::{InMemoryRepository, PROGRESS_KEY, Storage};

async fn engine_over(
    storage: &Storage,
    remote: &ScriptedRemote,
    presenter: &RecordingPresenter,
) -> ProgressionEngine {
    ProgressionEngine::load(
        storage.progress_store(),
        GithubApi::new(Arc::new(remote.clone())),
        Arc::new(presenter.clone()),
        TutorialSettings::default(),
    )
    .await
    .unwrap()
    .with_clock(fixed_clock())
}

#[tokio::test]
async fn intents_are_applied_in_order() {
    let storage = Storage::in_memory();
    let remote = ScriptedRemote::new();
    let presenter = RecordingPresenter::new();
    remote.respond(
        ApiQuery::user(&Identity::parse("octocat").unwrap()),
        json!({ "login": "octocat" }),
    );
    let engine = engine_over(&storage, &remote, &presenter).await;

    let (tx, rx) = mpsc::channel(8);
    tx.send(Intent::Login("octocat".into())).await.unwrap();
    tx.send(Intent::CheckCurrent).await.unwrap();
    tx.send(Intent::Skip(LevelId::new(2))).await.unwrap();
    tx.send(Intent::Quit).await.unwrap();

    let engine = Driver::new(engine).run(rx).await.unwrap();

    let session = engine.session();
    assert_eq!(session.current(), Stage::level(2));
    assert!(session.is_pending(LevelId::new(1)));
    // The rejected skip is reported beside the current level.
    assert!(presenter.message_for(LevelId::new(2)).is_some());
}

#[tokio::test(start_paused = true)]
async fn pending_levels_are_rechecked_at_start_up() {
    let storage = Storage {
        progress: Arc::new(InMemoryRepository::with_record(
            PROGRESS_KEY,
            r#"{"identity":"octocat","current_level":{"level":2},"completed_levels":[0],"pending_checks":{"1":{}}}"#,
        )),
    };
    let remote = ScriptedRemote::new();
    let presenter = RecordingPresenter::new();
    let settings = TutorialSettings::default();
    remote.respond(
        ApiQuery::issue_comments(settings.tutorial_repo(), 1),
        json!([{ "user": { "login": "octocat" } }]),
    );
    remote.respond(ApiQuery::rate_limit(), json!({ "resources": {} }));
    let engine = engine_over(&storage, &remote, &presenter).await;
    let probe = ConnectivityProbe::new(
        GithubApi::new(Arc::new(remote.clone())),
        Arc::new(presenter.clone()),
    );

    let (tx, rx) = mpsc::channel(8);
    let task = tokio::spawn(Driver::new(engine).with_probe(probe).run(rx));

    for _ in 0..50 {
        let stored = storage.progress_store().load().await.unwrap();
        if stored.is_completed(LevelId::new(1)) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tx.send(Intent::Quit).await.unwrap();
    let engine = task.await.unwrap().unwrap();

    assert!(engine.session().is_completed(LevelId::new(1)));
    assert!(engine.session().pending().is_empty());
    assert!(
        presenter
            .events()
            .contains(&PresenterEvent::Connection(ConnectionStatus::Online))
    );
}
