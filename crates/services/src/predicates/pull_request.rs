//! Predicates against the upstream repository (levels 15 and 16).

use async_trait::async_trait;
use tracing::{debug, warn};

use gazette_core::model::CapturedReferences;

use crate::error::ApiError;
use crate::github::IssueSearch;

use super::{Predicate, PredicateContext, Verdict};

/// Number of the player's first pull request against the upstream.
async fn find_upstream_pull(ctx: &PredicateContext<'_>) -> Result<Option<u64>, ApiError> {
    let search = IssueSearch::pull_requests(ctx.settings.fork_upstream(), ctx.identity);
    let results = ctx.api.search_issues(&search).await?;
    Ok(results.first().map(|pr| pr.number))
}

fn pull_ref(number: u64) -> CapturedReferences {
    CapturedReferences {
        pull_request: Some(number),
    }
}

async fn commented_on(ctx: &PredicateContext<'_>, number: u64) -> Result<bool, ApiError> {
    let comments = ctx
        .api
        .issue_comments(ctx.settings.fork_upstream(), number)
        .await?;
    Ok(comments.iter().any(|c| c.is_by(ctx.identity)))
}

/// Opened a pull request upstream; captures its number.
pub struct UpstreamPullRequest;

#[async_trait]
impl Predicate for UpstreamPullRequest {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        Ok(match find_upstream_pull(ctx).await? {
            Some(number) => {
                debug!(number, "captured upstream pull request");
                Verdict::satisfied().with_discovered(pull_ref(number))
            }
            None => Verdict::unsatisfied(),
        })
    }
}

/// Commented on the captured pull request.
///
/// Without a captured number the pull request is searched for. A captured
/// number that no longer resolves is searched for again before giving up.
pub struct PullRequestComment;

#[async_trait]
impl Predicate for PullRequestComment {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let Some(captured) = ctx.references.pull_request else {
            let Some(number) = find_upstream_pull(ctx).await? else {
                return Ok(Verdict::unsatisfied());
            };
            let satisfied = commented_on(ctx, number).await?;
            return Ok(Verdict::when(satisfied).with_discovered(pull_ref(number)));
        };

        match commented_on(ctx, captured).await {
            Ok(satisfied) => Ok(Verdict::when(satisfied)),
            Err(ApiError::NotFound(_)) => {
                warn!(
                    number = captured,
                    "captured pull request no longer resolves, searching again"
                );
                match find_upstream_pull(ctx).await? {
                    Some(number) if number != captured => {
                        let satisfied = commented_on(ctx, number).await?;
                        Ok(Verdict::when(satisfied).with_discovered(pull_ref(number)))
                    }
                    _ => Ok(Verdict::unsatisfied()),
                }
            }
            Err(err) => Err(err),
        }
    }
}
