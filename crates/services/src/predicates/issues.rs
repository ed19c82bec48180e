//! Predicates against the tutorial repository (levels 0 to 10).

use async_trait::async_trait;

use crate::error::ApiError;
use crate::github::types::{Comment, Issue};
use crate::github::{IssueSearch, SearchState};

use super::{Predicate, PredicateContext, Verdict, was_edited};

/// Title keywords the practice issue is expected to carry.
pub const ANCHOR_KEYWORDS: [&str; 2] = ["Anchor", "Tight"];

/// Issue the tutorial tells the player to comment on first.
pub const WELCOME_ISSUE: u64 = 1;

const LICENSE_PATH: &str = "LICENSE";

/// First closed practice issue authored by the player.
async fn anchor_issue(ctx: &PredicateContext<'_>) -> Result<Option<Issue>, ApiError> {
    let search = IssueSearch::issues(ctx.settings.tutorial_repo(), ctx.identity)
        .state(SearchState::Closed)
        .any_keyword(&ANCHOR_KEYWORDS);
    let results = ctx.api.search_issues(&search).await?;
    Ok(results.items.into_iter().next())
}

async fn authored_comments(
    ctx: &PredicateContext<'_>,
    number: u64,
) -> Result<Vec<Comment>, ApiError> {
    let comments = ctx
        .api
        .issue_comments(ctx.settings.tutorial_repo(), number)
        .await?;
    Ok(comments
        .into_iter()
        .filter(|c| c.is_by(ctx.identity))
        .collect())
}

pub struct AccountExists;

#[async_trait]
impl Predicate for AccountExists {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        match ctx.api.account(ctx.identity).await {
            Ok(_) => Ok(Verdict::satisfied()),
            Err(ApiError::NotFound(_)) => Ok(Verdict::unsatisfied()),
            Err(err) => Err(err),
        }
    }
}

pub struct WelcomeIssueComment;

#[async_trait]
impl Predicate for WelcomeIssueComment {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let mine = authored_comments(ctx, WELCOME_ISSUE).await?;
        Ok(Verdict::when(!mine.is_empty()))
    }
}

pub struct ClosedIssue;

#[async_trait]
impl Predicate for ClosedIssue {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        Ok(Verdict::when(anchor_issue(ctx).await?.is_some()))
    }
}

/// The practice issue was edited after it was opened. Search hits carry
/// stale timestamps, so the issue itself is fetched.
pub struct IssueEdited;

#[async_trait]
impl Predicate for IssueEdited {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let Some(hit) = anchor_issue(ctx).await? else {
            return Ok(Verdict::unsatisfied());
        };
        let issue = ctx
            .api
            .issue(ctx.settings.tutorial_repo(), hit.number)
            .await?;
        Ok(Verdict::when(was_edited(
            issue.created_at,
            issue.updated_at,
            ctx.timing.edit_tolerance,
        )))
    }
}

pub struct IssueCommentEdited;

#[async_trait]
impl Predicate for IssueCommentEdited {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let Some(hit) = anchor_issue(ctx).await? else {
            return Ok(Verdict::unsatisfied());
        };
        let mine = authored_comments(ctx, hit.number).await?;
        let edited = mine
            .iter()
            .any(|c| was_edited(c.created_at, c.updated_at, ctx.timing.edit_tolerance));
        Ok(Verdict::when(edited))
    }
}

pub struct IssueCommentCount {
    pub min: usize,
}

#[async_trait]
impl Predicate for IssueCommentCount {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let Some(hit) = anchor_issue(ctx).await? else {
            return Ok(Verdict::unsatisfied());
        };
        let mine = authored_comments(ctx, hit.number).await?;
        Ok(Verdict::when(mine.len() >= self.min))
    }
}

pub struct IssueLabeled;

#[async_trait]
impl Predicate for IssueLabeled {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let Some(hit) = anchor_issue(ctx).await? else {
            return Ok(Verdict::unsatisfied());
        };
        let labels = match hit.labels {
            Some(labels) => labels,
            None => ctx
                .api
                .issue(ctx.settings.tutorial_repo(), hit.number)
                .await?
                .labels
                .unwrap_or_default(),
        };
        Ok(Verdict::when(!labels.is_empty()))
    }
}

pub struct IssueSelfAssigned;

#[async_trait]
impl Predicate for IssueSelfAssigned {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let Some(hit) = anchor_issue(ctx).await? else {
            return Ok(Verdict::unsatisfied());
        };
        let assigned = match hit.assigned_to(ctx.identity) {
            Some(assigned) => assigned,
            None => ctx
                .api
                .issue(ctx.settings.tutorial_repo(), hit.number)
                .await?
                .assigned_to(ctx.identity)
                .unwrap_or(false),
        };
        Ok(Verdict::when(assigned))
    }
}

pub struct LicenseFile;

#[async_trait]
impl Predicate for LicenseFile {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let exists = ctx
            .api
            .file_exists(ctx.settings.tutorial_repo(), LICENSE_PATH)
            .await?;
        Ok(Verdict::when(exists))
    }
}

pub struct OpenPullRequest;

#[async_trait]
impl Predicate for OpenPullRequest {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let search = IssueSearch::pull_requests(ctx.settings.tutorial_repo(), ctx.identity)
            .state(SearchState::Open);
        let results = ctx.api.search_issues(&search).await?;
        Ok(Verdict::when(!results.items.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::ApiQuery;
    use crate::predicates::test_support::Fixture;
    use gazette_core::model::CapturedReferences;
    use serde_json::json;

    fn anchor_query(fx: &Fixture) -> ApiQuery {
        ApiQuery::search(
            &IssueSearch::issues(fx.settings.tutorial_repo(), &fx.identity)
                .state(SearchState::Closed)
                .any_keyword(&ANCHOR_KEYWORDS),
        )
    }

    fn with_anchor_hit(fx: &Fixture, hit: serde_json::Value) {
        fx.remote
            .respond(anchor_query(fx), json!({ "total_count": 1, "items": [hit] }));
    }

    #[tokio::test]
    async fn welcome_comment_requires_authored_comment() {
        let fx = Fixture::new();
        let query = ApiQuery::issue_comments(fx.settings.tutorial_repo(), WELCOME_ISSUE);
        fx.remote
            .respond(query.clone(), json!([{ "user": { "login": "hubot" } }]));

        let verdict = WelcomeIssueComment
            .evaluate(&fx.ctx(CapturedReferences::default()))
            .await
            .unwrap();
        assert!(!verdict.satisfied);

        fx.remote.respond(
            query,
            json!([{ "user": { "login": "hubot" } }, { "user": { "login": "OctoCat" } }]),
        );
        let verdict = WelcomeIssueComment
            .evaluate(&fx.ctx(CapturedReferences::default()))
            .await
            .unwrap();
        assert!(verdict.satisfied);
    }

    #[tokio::test]
    async fn closed_issue_needs_a_search_hit() {
        let fx = Fixture::new();
        fx.remote
            .respond(anchor_query(&fx), json!({ "total_count": 0, "items": [] }));
        let ctx = fx.ctx(CapturedReferences::default());
        assert!(!ClosedIssue.evaluate(&ctx).await.unwrap().satisfied);

        with_anchor_hit(&fx, json!({ "number": 5, "title": "Anchor the boat" }));
        assert!(ClosedIssue.evaluate(&ctx).await.unwrap().satisfied);
    }

    #[tokio::test]
    async fn issue_edit_is_read_from_the_issue_itself() {
        let fx = Fixture::new();
        with_anchor_hit(
            &fx,
            json!({
                "number": 5,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }),
        );
        fx.remote.respond(
            ApiQuery::issue(fx.settings.tutorial_repo(), 5),
            json!({
                "number": 5,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:01.500Z"
            }),
        );

        let verdict = IssueEdited
            .evaluate(&fx.ctx(CapturedReferences::default()))
            .await
            .unwrap();
        assert!(verdict.satisfied);
    }

    #[tokio::test]
    async fn comment_edit_within_tolerance_does_not_count() {
        let fx = Fixture::new();
        with_anchor_hit(&fx, json!({ "number": 5 }));
        fx.remote.respond(
            ApiQuery::issue_comments(fx.settings.tutorial_repo(), 5),
            json!([
                {
                    "user": { "login": "octocat" },
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-01T00:00:01Z"
                },
                {
                    "user": { "login": "hubot" },
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-01-02T00:00:00Z"
                }
            ]),
        );

        let verdict = IssueCommentEdited
            .evaluate(&fx.ctx(CapturedReferences::default()))
            .await
            .unwrap();
        assert!(!verdict.satisfied);
    }

    #[tokio::test]
    async fn comment_count_counts_only_authored_comments() {
        let fx = Fixture::new();
        with_anchor_hit(&fx, json!({ "number": 5 }));
        fx.remote.respond(
            ApiQuery::issue_comments(fx.settings.tutorial_repo(), 5),
            json!([
                { "user": { "login": "octocat" } },
                { "user": { "login": "hubot" } },
                { "user": { "login": "octocat" } }
            ]),
        );
        let ctx = fx.ctx(CapturedReferences::default());

        assert!(IssueCommentCount { min: 2 }.evaluate(&ctx).await.unwrap().satisfied);
        assert!(!IssueCommentCount { min: 3 }.evaluate(&ctx).await.unwrap().satisfied);
    }

    #[tokio::test]
    async fn labels_on_the_hit_avoid_a_second_fetch() {
        let fx = Fixture::new();
        with_anchor_hit(&fx, json!({ "number": 5, "labels": [{ "name": "bug" }] }));

        let verdict = IssueLabeled
            .evaluate(&fx.ctx(CapturedReferences::default()))
            .await
            .unwrap();

        assert!(verdict.satisfied);
        assert_eq!(fx.remote.call_count(), 1);
    }

    #[tokio::test]
    async fn assignment_falls_back_to_the_issue() {
        let fx = Fixture::new();
        with_anchor_hit(&fx, json!({ "number": 5 }));
        fx.remote.respond(
            ApiQuery::issue(fx.settings.tutorial_repo(), 5),
            json!({ "number": 5, "assignee": { "login": "octocat" }, "assignees": [] }),
        );

        let verdict = IssueSelfAssigned
            .evaluate(&fx.ctx(CapturedReferences::default()))
            .await
            .unwrap();

        assert!(verdict.satisfied);
        assert_eq!(fx.remote.call_count(), 2);
    }

    #[tokio::test]
    async fn missing_license_is_unsatisfied() {
        let fx = Fixture::new();
        let ctx = fx.ctx(CapturedReferences::default());
        assert!(!LicenseFile.evaluate(&ctx).await.unwrap().satisfied);

        fx.remote.respond(
            ApiQuery::contents(fx.settings.tutorial_repo(), LICENSE_PATH),
            json!({ "name": "LICENSE" }),
        );
        assert!(LicenseFile.evaluate(&ctx).await.unwrap().satisfied);
    }

    #[tokio::test]
    async fn search_outage_is_an_error() {
        let fx = Fixture::new();
        fx.remote.status(anchor_query(&fx), 403);

        let err = ClosedIssue
            .evaluate(&fx.ctx(CapturedReferences::default()))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
