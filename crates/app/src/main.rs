use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gazette_core::model::LevelId;
use services::config::parse_seconds;
use services::{AppServices, Direction, Intent, TutorialConfig};

mod cli;
mod db;
mod terminal;

use cli::{Cli, Command, PLAY_HELP, parse_intent};
use terminal::TerminalPresenter;

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn play(services: AppServices) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        println!("{PLAY_HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim() == "help" {
                println!("{PLAY_HELP}");
                continue;
            }
            match parse_intent(&line) {
                Ok(intent) => {
                    let quit = intent == Intent::Quit;
                    if tx.send(intent).await.is_err() || quit {
                        break;
                    }
                }
                Err(hint) => println!("{hint}"),
            }
        }
        debug!("input closed");
    });

    services
        .into_driver()
        .run(rx)
        .await
        .context("interactive session ended")?;
    Ok(())
}

async fn run_once(mut services: AppServices, command: Command) -> anyhow::Result<()> {
    let engine = services.engine_mut();
    match command {
        Command::Play | Command::Status => {
            engine.render();
            let pending = engine.session().pending().levels();
            if !pending.is_empty() {
                let list: Vec<String> = pending.iter().map(ToString::to_string).collect();
                println!("Pending: {}", list.join(", "));
            }
        }
        Command::Login { username } => {
            engine.login(&username).await?;
        }
        Command::Check { level } => {
            let outcome = match level {
                Some(id) => engine.check(LevelId::new(id)).await?,
                None => engine.check_current().await?,
            };
            debug!(?outcome, "check finished");
        }
        Command::Skip { level } => {
            match level {
                Some(id) => engine.skip(LevelId::new(id)).await?,
                None => engine.skip_current().await?,
            };
        }
        Command::Next => {
            engine.navigate(Direction::Next).await?;
        }
        Command::Prev => {
            engine.navigate(Direction::Previous).await?;
        }
        Command::Recheck => {
            let report = engine.recheck_pending().await?;
            for (level, outcome) in &report.checked {
                println!("level {level}: {outcome:?}");
            }
            if report.checked.is_empty() && report.debounced.is_empty() {
                println!("Nothing is pending.");
            }
        }
        Command::Reset => {
            engine.reset().await?;
        }
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let recheck = cli
        .recheck_secs
        .map(|secs| parse_seconds("--recheck-secs", &secs.to_string()))
        .transpose()?;
    let config = TutorialConfig::from_env_with(cli.settings_overrides(), recheck)
        .context("invalid tutorial settings")?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let db_url = db::normalize_sqlite_url(&cli.db_url);
    db::prepare_sqlite_file(&db_url)?;

    let presenter = Arc::new(TerminalPresenter::new(config.settings.clone()));
    let services = AppServices::new_sqlite(&db_url, config, presenter)
        .await
        .with_context(|| format!("opening {db_url}"))?;

    match cli.command {
        None | Some(Command::Play) => play(services).await,
        Some(command) => run_once(services, command).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
