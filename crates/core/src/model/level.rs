use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifier of a tutorial level (0 = sign in, 17 = last challenge).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(u8);

impl LevelId {
    pub const SIGN_IN: Self = Self(0);
    pub const LAST: Self = Self(17);

    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// True for ids that name a level in the catalogue.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.0 <= Self::LAST.0
    }

    /// All level ids in ascending order.
    pub fn all() -> impl Iterator<Item = LevelId> {
        (Self::SIGN_IN.0..=Self::LAST.0).map(LevelId)
    }
}

impl fmt::Debug for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LevelId({})", self.0)
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A position in the tutorial: a level, or one of the two celebration screens.
///
/// Stages are totally ordered along the chain
/// `0 ..= 10, InterimVictory, 11 ..= 17, FinalVictory`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Level(LevelId),
    InterimVictory,
    FinalVictory,
}

/// Level after which the interim celebration is shown.
const INTERIM_AFTER: u8 = 10;

impl Stage {
    pub const FIRST: Stage = Stage::Level(LevelId::SIGN_IN);
    pub const TERMINAL: Stage = Stage::FinalVictory;

    #[must_use]
    pub const fn level(id: u8) -> Self {
        Stage::Level(LevelId::new(id))
    }

    /// Position along the chain; `FIRST` is 0 and `TERMINAL` is the maximum.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        match self {
            Stage::Level(id) if id.value() <= INTERIM_AFTER => id.value(),
            Stage::Level(id) => id.value() + 1,
            Stage::InterimVictory => INTERIM_AFTER + 1,
            Stage::FinalVictory => LevelId::LAST.value() + 2,
        }
    }

    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        let interim = INTERIM_AFTER + 1;
        match ordinal {
            o if o < interim => Some(Stage::level(o)),
            o if o == interim => Some(Stage::InterimVictory),
            o if o <= LevelId::LAST.value() + 1 => Some(Stage::level(o - 1)),
            o if o == LevelId::LAST.value() + 2 => Some(Stage::FinalVictory),
            _ => None,
        }
    }

    #[must_use]
    pub fn level_id(&self) -> Option<LevelId> {
        match self {
            Stage::Level(id) => Some(*id),
            Stage::InterimVictory | Stage::FinalVictory => None,
        }
    }

    /// True when the stage exists on the chain (rejects level ids past the catalogue).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Stage::Level(id) => id.is_known(),
            Stage::InterimVictory | Stage::FinalVictory => true,
        }
    }

    #[must_use]
    pub fn next(&self) -> Option<Self> {
        Self::from_ordinal(self.ordinal() + 1)
    }

    #[must_use]
    pub fn previous(&self) -> Option<Self> {
        self.ordinal().checked_sub(1).and_then(Self::from_ordinal)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::FIRST
    }
}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl From<LevelId> for Stage {
    fn from(id: LevelId) -> Self {
        Stage::Level(id)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Level(id) => write!(f, "level {id}"),
            Stage::InterimVictory => f.write_str("interim victory"),
            Stage::FinalVictory => f.write_str("victory"),
        }
    }
}

/// Which remote condition a level waits for. The services layer maps each
/// kind to a predicate implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckKind {
    AccountExists,
    WelcomeIssueComment,
    ClosedIssue,
    IssueEdited,
    IssueCommentEdited,
    IssueCommentCount { min: usize },
    IssueLabeled,
    IssueSelfAssigned,
    LicenseFile,
    OpenPullRequest,
    ForkCreated,
    AuthoredCommits { min: usize },
    CustomBranch,
    UpstreamPullRequest,
    PullRequestComment,
}

/// Page a user can open to verify a level by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerifyPage {
    SignUp,
    WelcomeIssue,
    TutorialIssues,
    TutorialPulls,
    TutorialLicense,
    Fork,
    ForkCommits,
    ForkBranches,
    UpstreamPulls,
    PullRequest,
}

/// Static descriptor of one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelSpec {
    pub id: LevelId,
    pub title: &'static str,
    pub optional: bool,
    pub check: CheckKind,
    pub unlock: Stage,
    pub verify_page: VerifyPage,
}

impl LevelSpec {
    #[must_use]
    pub fn stage(&self) -> Stage {
        Stage::Level(self.id)
    }

    #[must_use]
    pub fn ordinal(&self) -> u8 {
        self.stage().ordinal()
    }
}

const fn spec(
    id: u8,
    title: &'static str,
    check: CheckKind,
    unlock: Stage,
    verify_page: VerifyPage,
) -> LevelSpec {
    LevelSpec {
        id: LevelId::new(id),
        title,
        optional: false,
        check,
        unlock,
        verify_page,
    }
}

static LEVELS: [LevelSpec; 18] = [
    spec(0, "Sign in", CheckKind::AccountExists, Stage::level(1), VerifyPage::SignUp),
    spec(
        1,
        "Comment on issue #1",
        CheckKind::WelcomeIssueComment,
        Stage::level(2),
        VerifyPage::WelcomeIssue,
    ),
    spec(
        2,
        "Open and close an issue",
        CheckKind::ClosedIssue,
        Stage::level(3),
        VerifyPage::TutorialIssues,
    ),
    spec(
        3,
        "Edit the issue title",
        CheckKind::IssueEdited,
        Stage::level(4),
        VerifyPage::TutorialIssues,
    ),
    spec(
        4,
        "Edit the issue description",
        CheckKind::IssueEdited,
        Stage::level(5),
        VerifyPage::TutorialIssues,
    ),
    spec(
        5,
        "Edit a comment",
        CheckKind::IssueCommentEdited,
        Stage::level(6),
        VerifyPage::TutorialIssues,
    ),
    spec(
        6,
        "Reopen and close again",
        CheckKind::IssueCommentCount { min: 2 },
        Stage::level(7),
        VerifyPage::TutorialIssues,
    ),
    spec(7, "Add a label", CheckKind::IssueLabeled, Stage::level(8), VerifyPage::TutorialIssues),
    spec(
        8,
        "Assign yourself",
        CheckKind::IssueSelfAssigned,
        Stage::level(9),
        VerifyPage::TutorialIssues,
    ),
    spec(9, "Add a LICENSE", CheckKind::LicenseFile, Stage::level(10), VerifyPage::TutorialLicense),
    spec(
        10,
        "Open a pull request",
        CheckKind::OpenPullRequest,
        Stage::InterimVictory,
        VerifyPage::TutorialPulls,
    ),
    spec(11, "Fork the gazette", CheckKind::ForkCreated, Stage::level(12), VerifyPage::Fork),
    spec(
        12,
        "Edit a file on the web",
        CheckKind::AuthoredCommits { min: 1 },
        Stage::level(13),
        VerifyPage::ForkCommits,
    ),
    LevelSpec {
        id: LevelId::new(13),
        title: "Create a branch",
        optional: true,
        check: CheckKind::CustomBranch,
        unlock: Stage::level(14),
        verify_page: VerifyPage::ForkBranches,
    },
    spec(
        14,
        "Commit with a clear message",
        CheckKind::AuthoredCommits { min: 2 },
        Stage::level(15),
        VerifyPage::ForkCommits,
    ),
    spec(
        15,
        "Open a pull request upstream",
        CheckKind::UpstreamPullRequest,
        Stage::level(16),
        VerifyPage::UpstreamPulls,
    ),
    spec(
        16,
        "Comment on your pull request",
        CheckKind::PullRequestComment,
        Stage::level(17),
        VerifyPage::PullRequest,
    ),
    spec(
        17,
        "Address review feedback",
        CheckKind::AuthoredCommits { min: 3 },
        Stage::FinalVictory,
        VerifyPage::ForkCommits,
    ),
];

/// The full catalogue in ascending id order.
#[must_use]
pub fn levels() -> &'static [LevelSpec] {
    &LEVELS
}

#[must_use]
pub fn level(id: LevelId) -> Option<&'static LevelSpec> {
    LEVELS.get(usize::from(id.value()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_indexed_by_id() {
        for (idx, spec) in levels().iter().enumerate() {
            assert_eq!(usize::from(spec.id.value()), idx);
        }
        assert!(level(LevelId::new(18)).is_none());
    }

    #[test]
    fn interim_victory_sits_between_ten_and_eleven() {
        assert!(Stage::level(10) < Stage::InterimVictory);
        assert!(Stage::InterimVictory < Stage::level(11));
        assert_eq!(Stage::level(10).next(), Some(Stage::InterimVictory));
        assert_eq!(Stage::InterimVictory.next(), Some(Stage::level(11)));
        assert_eq!(Stage::level(11).previous(), Some(Stage::InterimVictory));
    }

    #[test]
    fn chain_ends_at_final_victory() {
        assert_eq!(Stage::level(17).next(), Some(Stage::FinalVictory));
        assert_eq!(Stage::FinalVictory.next(), None);
        assert_eq!(Stage::FIRST.previous(), None);
        assert_eq!(Stage::TERMINAL, Stage::FinalVictory);
    }

    #[test]
    fn ordinals_round_trip_along_the_chain() {
        let mut stage = Stage::FIRST;
        let mut seen = 1;
        while let Some(next) = stage.next() {
            assert!(next > stage);
            assert_eq!(Stage::from_ordinal(next.ordinal()), Some(next));
            stage = next;
            seen += 1;
        }
        assert_eq!(seen, 20);
    }

    #[test]
    fn unlock_targets_step_forward_by_one() {
        for spec in levels() {
            assert_eq!(spec.stage().next(), Some(spec.unlock), "level {}", spec.id);
        }
    }

    #[test]
    fn only_the_branch_level_is_optional() {
        let optional: Vec<_> = levels().iter().filter(|l| l.optional).map(|l| l.id).collect();
        assert_eq!(optional, vec![LevelId::new(13)]);
    }

    #[test]
    fn stage_serializes_with_tags() {
        let json = serde_json::to_string(&Stage::level(4)).unwrap();
        assert_eq!(json, r#"{"level":4}"#);
        let json = serde_json::to_string(&Stage::InterimVictory).unwrap();
        assert_eq!(json, r#""interim_victory""#);
    }
}
