mod identity;
mod level;
mod session;
mod settings;

pub use identity::{Identity, IdentityError};
pub use level::{CheckKind, LevelId, LevelSpec, Stage, VerifyPage, level, levels};
pub use session::{
    CapturedReferences, PendingCheck, PendingChecks, Profile, Session, SessionRepair,
};
pub use settings::{
    DEFAULT_API_BASE, DEFAULT_FORK_UPSTREAM, DEFAULT_TUTORIAL_REPO, DEFAULT_WEB_BASE, RepoSlug,
    SettingsError, TutorialSettings, TutorialSettingsDraft,
};
