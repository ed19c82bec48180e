use std::fmt;

use gazette_core::model::{Identity, RepoSlug};

/// A read-only request against the hosting API.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ApiQuery {
    /// Fetch a single resource by path.
    Resource(String),
    /// Search issues and pull requests with a structured query string.
    Search(String),
    /// List the sub-resources of a parent resource.
    List {
        parent: String,
        collection: &'static str,
    },
}

impl ApiQuery {
    #[must_use]
    pub fn user(login: &Identity) -> Self {
        Self::Resource(format!("users/{login}"))
    }

    #[must_use]
    pub fn repository(repo: &RepoSlug) -> Self {
        Self::Resource(format!("repos/{repo}"))
    }

    #[must_use]
    pub fn issue(repo: &RepoSlug, number: u64) -> Self {
        Self::Resource(format!("repos/{repo}/issues/{number}"))
    }

    #[must_use]
    pub fn issue_comments(repo: &RepoSlug, number: u64) -> Self {
        Self::List {
            parent: format!("repos/{repo}/issues/{number}"),
            collection: "comments",
        }
    }

    #[must_use]
    pub fn contents(repo: &RepoSlug, path: &str) -> Self {
        Self::Resource(format!("repos/{repo}/contents/{path}"))
    }

    #[must_use]
    pub fn commits(repo: &RepoSlug) -> Self {
        Self::List {
            parent: format!("repos/{repo}"),
            collection: "commits",
        }
    }

    #[must_use]
    pub fn branches(repo: &RepoSlug) -> Self {
        Self::List {
            parent: format!("repos/{repo}"),
            collection: "branches",
        }
    }

    #[must_use]
    pub fn rate_limit() -> Self {
        Self::Resource("rate_limit".to_owned())
    }

    #[must_use]
    pub fn search(search: &IssueSearch) -> Self {
        Self::Search(search.to_string())
    }

    /// Path relative to the API base, without a leading slash.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Resource(path) => path.clone(),
            Self::Search(_) => "search/issues".to_owned(),
            Self::List { parent, collection } => format!("{parent}/{collection}"),
        }
    }

    /// Query-string parameters; only searches carry any.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Search(q) => vec![("q", q.clone())],
            Self::Resource(_) | Self::List { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for ApiQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search(q) => write!(f, "search/issues?q={q}"),
            other => f.write_str(&other.path()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Issue,
    PullRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchState {
    Open,
    Closed,
}

/// Structured issue/PR search, rendered as
/// `repo:o/n is:issue state:closed author:u "k1" OR "k2"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IssueSearch {
    repo: RepoSlug,
    kind: SearchKind,
    state: Option<SearchState>,
    author: Identity,
    keywords: Vec<&'static str>,
}

impl IssueSearch {
    #[must_use]
    pub fn issues(repo: &RepoSlug, author: &Identity) -> Self {
        Self::new(repo, SearchKind::Issue, author)
    }

    #[must_use]
    pub fn pull_requests(repo: &RepoSlug, author: &Identity) -> Self {
        Self::new(repo, SearchKind::PullRequest, author)
    }

    fn new(repo: &RepoSlug, kind: SearchKind, author: &Identity) -> Self {
        Self {
            repo: repo.clone(),
            kind,
            state: None,
            author: author.clone(),
            keywords: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(mut self, state: SearchState) -> Self {
        self.state = Some(state);
        self
    }

    /// Match any of `keywords` (joined with `OR`).
    #[must_use]
    pub fn any_keyword(mut self, keywords: &[&'static str]) -> Self {
        self.keywords.extend_from_slice(keywords);
        self
    }
}

impl fmt::Display for IssueSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SearchKind::Issue => "issue",
            SearchKind::PullRequest => "pr",
        };
        write!(f, "repo:{} is:{kind}", self.repo)?;
        match self.state {
            Some(SearchState::Open) => f.write_str(" state:open")?,
            Some(SearchState::Closed) => f.write_str(" state:closed")?,
            None => {}
        }
        write!(f, " author:{}", self.author)?;
        for (idx, keyword) in self.keywords.iter().enumerate() {
            let sep = if idx == 0 { " " } else { " OR " };
            write!(f, "{sep}\"{keyword}\"")?;
        }
        Ok(())
    }
}
