use std::io::{self, Write};

use gazette_core::model::{LevelId, Session, Stage, TutorialSettings, level, levels};
use services::progression::{ConnectionStatus, InlineMessage, Presenter, Severity};

/// Presents the tutorial as plain text on stdout.
pub struct TerminalPresenter {
    settings: TutorialSettings,
}

impl TerminalPresenter {
    pub fn new(settings: TutorialSettings) -> Self {
        Self { settings }
    }
}

fn status_line(session: &Session) -> String {
    let done = session.completed().len();
    let total = levels().len();
    match (session.identity(), session.profile()) {
        (Some(_), Some(profile)) => format!(
            "Signed in as {} ({} followers, {} public repos). {done}/{total} levels done.",
            profile.display_name, profile.followers, profile.public_repos
        ),
        (Some(identity), None) => format!("Signed in as {identity}. {done}/{total} levels done."),
        (None, _) => "Not signed in.".to_owned(),
    }
}

fn level_badge(session: &Session, id: LevelId) -> &'static str {
    if session.is_completed(id) {
        " [done]"
    } else if session.is_pending(id) {
        " [pending]"
    } else if session.skipped().contains(&id) {
        " [skipped]"
    } else {
        ""
    }
}

impl Presenter for TerminalPresenter {
    fn render_level(&self, stage: Stage, session: &Session) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", status_line(session));
        match stage {
            Stage::InterimVictory => {
                let _ = writeln!(
                    out,
                    "Halfway there! The tutorial repository is behind you. Type `next` to fork the gazette."
                );
            }
            Stage::FinalVictory => {
                let _ = writeln!(out, "Victory! You finished the Git-Goat's Gazette.");
            }
            Stage::Level(id) => {
                let Some(spec) = level(id) else {
                    return;
                };
                let optional = if spec.optional { " (optional)" } else { "" };
                let _ = writeln!(
                    out,
                    "Level {id}: {}{optional}{}",
                    spec.title,
                    level_badge(session, id)
                );
                let url = self.settings.verify_url(
                    spec.verify_page,
                    session.identity(),
                    session.references(),
                );
                let _ = writeln!(out, "  {url}");
            }
        }
    }

    fn show_inline_message(&self, level: LevelId, message: &InlineMessage) {
        let tag = match message.severity {
            Severity::Info => "note",
            Severity::Advisory => "pending",
            Severity::Error => "error",
        };
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "[level {level} {tag}] {}", message.text);
        if let Some(url) = &message.verify_url {
            let _ = writeln!(out, "  Verify at: {url}");
        }
    }

    fn clear_inline_message(&self, _level: LevelId) {}

    fn show_blocking_modal(&self, seconds_remaining: u32) {
        let mut out = io::stdout().lock();
        let _ = write!(
            out,
            "\rFinish this level before moving on. Redirecting in {seconds_remaining}s... "
        );
        let _ = out.flush();
    }

    fn hide_blocking_modal(&self) {
        let _ = writeln!(io::stdout());
    }

    fn show_connection_status(&self, status: ConnectionStatus) {
        match status {
            ConnectionStatus::Online => println!("(connected)"),
            ConnectionStatus::Degraded(Some(code)) => {
                println!("(API answering with {code}; checks may be rate limited)");
            }
            ConnectionStatus::Degraded(None) => println!("(API answering oddly; checks may fail)"),
            ConnectionStatus::Unreachable => println!("(offline; checks will wait)"),
        }
    }
}
