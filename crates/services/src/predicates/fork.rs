//! Predicates against the player's fork (levels 11 to 14 and 17).

use async_trait::async_trait;

use crate::error::ApiError;

use super::{Predicate, PredicateContext, Verdict};

const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

/// The fork exists under the player's account and points at the upstream.
pub struct ForkCreated;

#[async_trait]
impl Predicate for ForkCreated {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let fork = ctx.settings.fork_of(ctx.identity);
        let Some(repo) = ctx.api.repository(&fork).await? else {
            return Ok(Verdict::unsatisfied());
        };
        let upstream = ctx.settings.fork_upstream();
        let parent_matches = repo
            .parent
            .as_ref()
            .is_some_and(|p| upstream.matches_full_name(&p.full_name));
        Ok(Verdict::when(repo.fork && parent_matches))
    }
}

pub struct AuthoredCommits {
    pub min: usize,
}

#[async_trait]
impl Predicate for AuthoredCommits {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let fork = ctx.settings.fork_of(ctx.identity);
        let Some(commits) = ctx.api.commits(&fork).await? else {
            return Ok(Verdict::unsatisfied());
        };
        let mine = commits.iter().filter(|c| c.is_by(ctx.identity)).count();
        Ok(Verdict::when(mine >= self.min))
    }
}

/// Any branch on the fork besides the default one.
pub struct CustomBranch;

#[async_trait]
impl Predicate for CustomBranch {
    async fn evaluate(&self, ctx: &PredicateContext<'_>) -> Result<Verdict, ApiError> {
        let fork = ctx.settings.fork_of(ctx.identity);
        let Some(branches) = ctx.api.branches(&fork).await? else {
            return Ok(Verdict::unsatisfied());
        };
        let custom = branches
            .iter()
            .any(|b| !DEFAULT_BRANCHES.contains(&b.name.as_str()));
        Ok(Verdict::when(custom))
    }
}
