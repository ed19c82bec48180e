use clap::{Parser, Subcommand};

use gazette_core::model::{LevelId, TutorialSettingsDraft};
use services::{Direction, Intent};

#[derive(Debug, Parser)]
#[command(name = "gazette", version, about = "Git-Goat's Gazette: learn GitHub by doing")]
pub struct Cli {
    /// SQLite database holding your progress.
    #[arg(long = "db", env = "GAZETTE_DB_URL", default_value = "sqlite://gazette.sqlite3")]
    pub db_url: String,

    /// Log filter, e.g. `debug` or `services=trace`. `RUST_LOG` wins when set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// API base URL (defaults to GAZETTE_API_BASE, then the public API).
    #[arg(long)]
    pub api_base: Option<String>,

    /// Web base URL used for verification links.
    #[arg(long)]
    pub web_base: Option<String>,

    /// Tutorial repository as owner/name.
    #[arg(long)]
    pub repo: Option<String>,

    /// Repository players fork, as owner/name.
    #[arg(long)]
    pub fork_upstream: Option<String>,

    /// Seconds between background rechecks of pending levels.
    #[arg(long)]
    pub recheck_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn settings_overrides(&self) -> TutorialSettingsDraft {
        TutorialSettingsDraft {
            api_base: self.api_base.clone(),
            web_base: self.web_base.clone(),
            tutorial_repo: self.repo.clone(),
            fork_upstream: self.fork_upstream.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive session with background rechecks (default).
    Play,
    /// Show where you are.
    Status,
    /// Sign in with your username.
    Login { username: String },
    /// Check a level (defaults to the current one).
    Check { level: Option<u8> },
    /// Skip an optional level (defaults to the current one).
    Skip { level: Option<u8> },
    /// Go to the next level.
    Next,
    /// Go to the previous level.
    Prev,
    /// Recheck every pending level once.
    Recheck,
    /// Forget all progress.
    Reset,
}

/// Parse one line typed during `play`.
pub fn parse_intent(line: &str) -> Result<Intent, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("type `help` for commands".to_owned());
    };
    let level = words
        .next()
        .map(|raw| {
            raw.parse::<u8>()
                .map(LevelId::new)
                .map_err(|_| format!("not a level number: {raw}"))
        })
        .transpose();

    match verb {
        "login" => match line.split_whitespace().nth(1) {
            Some(name) => Ok(Intent::Login(name.to_owned())),
            None => Err("usage: login <username>".to_owned()),
        },
        "check" => Ok(level?.map_or(Intent::CheckCurrent, Intent::Check)),
        "skip" => Ok(level?.map_or(Intent::SkipCurrent, Intent::Skip)),
        "next" | "n" => Ok(Intent::Navigate(Direction::Next)),
        "prev" | "p" | "back" => Ok(Intent::Navigate(Direction::Previous)),
        "reset" => Ok(Intent::Reset),
        "quit" | "exit" | "q" => Ok(Intent::Quit),
        other => Err(format!("unknown command: {other}")),
    }
}

pub const PLAY_HELP: &str =
    "commands: login <username> | check [level] | skip [level] | next | prev | reset | quit";
