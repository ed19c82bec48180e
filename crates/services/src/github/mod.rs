//! Read-only access to the hosting API.

mod client;
mod query;
mod scripted;
pub mod types;

pub use client::{GithubApi, GithubClient, RemoteApi};
pub use query::{ApiQuery, IssueSearch, SearchKind, SearchState};
pub use scripted::ScriptedRemote;
