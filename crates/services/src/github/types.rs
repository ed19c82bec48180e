//! Response payloads, trimmed to the fields the predicates read.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use gazette_core::model::{Identity, Profile};

#[derive(Clone, Debug, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Account {
    #[must_use]
    pub fn into_profile(self) -> Profile {
        let display_name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(self.login);
        Profile {
            display_name,
            bio: self.bio,
            location: self.location,
            followers: self.followers,
            public_repos: self.public_repos,
            avatar_url: self.avatar_url,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserRef {
    pub login: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    #[must_use]
    pub fn is_by(&self, identity: &Identity) -> bool {
        self.user.as_ref().is_some_and(|u| identity.matches(&u.login))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Label {
    pub name: String,
}

/// An issue or pull request, from a search hit or a direct fetch.
///
/// `labels` and `assignees` are `None` when the payload omitted them, which
/// tells predicates to fetch the issue itself.
#[derive(Clone, Debug, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Option<Vec<Label>>,
    #[serde(default)]
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub assignees: Option<Vec<UserRef>>,
}

impl Issue {
    /// `None` when the payload carries no assignee data.
    #[must_use]
    pub fn assigned_to(&self, identity: &Identity) -> Option<bool> {
        let assignees = self.assignees.as_ref()?;
        let primary = self
            .assignee
            .as_ref()
            .is_some_and(|a| identity.matches(&a.login));
        Some(primary || assignees.iter().any(|a| identity.matches(&a.login)))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchResults<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> SearchResults<T> {
    /// The first hit, which predicates treat as "the" matching resource.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RepositoryRef {
    pub full_name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub parent: Option<RepositoryRef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitAuthor {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<GitAuthor>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Commit {
    pub commit: CommitDetail,
    /// Linked account, absent when the commit email matches no account.
    #[serde(default)]
    pub author: Option<UserRef>,
}

impl Commit {
    /// Attributed to the player by linked account, or by a git author name
    /// containing the login.
    #[must_use]
    pub fn is_by(&self, identity: &Identity) -> bool {
        if self
            .author
            .as_ref()
            .is_some_and(|a| identity.matches(&a.login))
        {
            return true;
        }
        let login = identity.as_str().to_lowercase();
        self.commit
            .author
            .as_ref()
            .is_some_and(|a| a.name.to_lowercase().contains(&login))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Branch {
    pub name: String,
}
