use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use deep_research_common::{
    dedup_exact, Budget, ResearchError, ResearchQuery, ResearchResult, RetrievalError,
};

use crate::prompts;
use crate::retrieval::Retriever;
use crate::steps::{distill, expand_query, ContextBudget};
use crate::traits::StructuredGenerator;

/// Knobs threaded into the orchestrator. Everything has a default.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResearchOptions {
    /// Retrieval + distillation units allowed in flight across the whole tree.
    #[builder(default = 1)]
    pub concurrency: usize,
    /// Upper bound on learnings extracted from one query's documents.
    #[builder(default = 3)]
    pub learnings_per_query: usize,
    #[builder(default)]
    pub context: ContextBudget,
    #[builder(default = Some(Duration::from_secs(60)))]
    pub distill_timeout: Option<Duration>,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Outcome of one sub-query's unit of work.
enum Branch {
    /// Retrieval gave up; the branch contributes nothing.
    Skipped { query: String, error: RetrievalError },
    Completed(ResearchResult),
}

/// Turns one query into a bounded tree of search + distill work.
///
/// Each level expands its query into at most `breadth` sub-queries, runs
/// retrieval and distillation for each under a shared limiter, then recurses
/// with half the breadth (rounded up) while depth remains. Branches never share
/// mutable state; they return values that the level unions.
pub struct Orchestrator {
    generator: Arc<dyn StructuredGenerator>,
    retriever: Retriever,
    options: ResearchOptions,
    limiter: Semaphore,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn StructuredGenerator>,
        retriever: Retriever,
        options: ResearchOptions,
    ) -> Self {
        let limiter = Semaphore::new(options.concurrency.max(1));
        Self {
            generator,
            retriever,
            options,
            limiter,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort queued and in-flight branch units when `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &ResearchOptions {
        &self.options
    }

    pub fn generator(&self) -> &dyn StructuredGenerator {
        self.generator.as_ref()
    }

    pub async fn research(
        &self,
        query: &str,
        breadth: usize,
        depth: usize,
    ) -> Result<ResearchResult, ResearchError> {
        self.research_with(query.to_string(), Budget::new(breadth, depth), Vec::new(), Vec::new())
            .await
    }

    /// One level of the recursion, seeded with what the path so far has learned.
    pub fn research_with(
        &self,
        query: String,
        budget: Budget,
        learnings: Vec<String>,
        visited_urls: Vec<String>,
    ) -> BoxFuture<'_, Result<ResearchResult, ResearchError>> {
        async move {
            let queries = self
                .guard(expand_query(self.generator.as_ref(), &query, &learnings, budget.breadth))
                .await??;

            info!(
                breadth = budget.breadth,
                depth = budget.depth,
                queries = queries.len(),
                "Researching level"
            );

            let branches = queries
                .iter()
                .map(|q| self.branch(q, budget, &learnings, &visited_urls, &queries));
            let branches = try_join_all(branches).await?;

            let contributions = branches.into_iter().map(|branch| match branch {
                Branch::Completed(result) => result,
                Branch::Skipped { query, error } => {
                    debug!(query = %query, error = %error, "Branch contributed nothing");
                    ResearchResult::empty()
                }
            });
            Ok(ResearchResult::union(contributions, queries))
        }
        .boxed()
    }

    async fn branch(
        &self,
        query: &ResearchQuery,
        budget: Budget,
        learnings: &[String],
        visited_urls: &[String],
        level: &[ResearchQuery],
    ) -> Result<Branch, ResearchError> {
        let next = budget.descend();

        // The permit covers retrieval and distillation only. It is released
        // before recursing so a child never waits on its parent's slot.
        let (urls, distillation) = {
            let _permit = self.acquire().await?;

            let retrieval = match self.guard(self.retriever.retrieve(&query.text)).await? {
                Ok(retrieval) => retrieval,
                Err(error) => {
                    warn!(
                        query = %query.text,
                        attempts = error.attempts,
                        reason = error.last.reason(),
                        "Retrieval failed, dropping branch"
                    );
                    return Ok(Branch::Skipped {
                        query: query.text.clone(),
                        error,
                    });
                }
            };

            let distillation = self
                .guard(distill(
                    self.generator.as_ref(),
                    &query.text,
                    &retrieval.documents,
                    self.options.learnings_per_query,
                    next.breadth,
                    &self.options.context,
                    self.options.distill_timeout,
                ))
                .await??;
            (retrieval.urls(), distillation)
        };

        let mut learnings = learnings.to_vec();
        learnings.extend(distillation.learnings);
        let mut visited_urls = visited_urls.to_vec();
        visited_urls.extend(urls);

        if next.has_remaining_depth() {
            let follow_up =
                prompts::follow_up_query(&query.research_goal, &distillation.follow_up_questions);
            debug!(
                query = %query.text,
                breadth = next.breadth,
                depth = next.depth,
                "Descending"
            );
            let result = self
                .research_with(follow_up, next, learnings, visited_urls)
                .await?;
            return Ok(Branch::Completed(result));
        }

        Ok(Branch::Completed(ResearchResult {
            learnings: dedup_exact(learnings),
            visited_urls: dedup_exact(visited_urls),
            queries: level.to_vec(),
        }))
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, ResearchError> {
        self.guard(self.limiter.acquire())
            .await?
            .map_err(|_| ResearchError::Cancelled)
    }

    /// Run `work` unless the cancellation token fires first.
    async fn guard<F: Future>(&self, work: F) -> Result<F::Output, ResearchError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ResearchError::Cancelled),
            output = work => Ok(output),
        }
    }
}
