use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use deep_research_common::{AttemptFailure, RetrievalError, RetrievalResult};

use crate::traits::{SearchOptions, WebSearcher};

/// Bounded retry with pure exponential backoff (no jitter).
///
/// A backoff wait precedes every attempt, the first one included: attempt `n`
/// (0-based) waits `initial_backoff * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(5_000),
            attempt_timeout: Duration::from_millis(15_000),
        }
    }
}

impl RetryPolicy {
    /// Wait before the 0-based `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor)
    }

    /// Every wait a fully failing retrieval goes through, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.max(1)).map(|attempt| self.backoff(attempt))
    }
}

/// Search for one query with retries. No caching across queries.
pub struct Retriever {
    searcher: Arc<dyn WebSearcher>,
    policy: RetryPolicy,
    options: SearchOptions,
}

impl Retriever {
    pub fn new(searcher: Arc<dyn WebSearcher>, policy: RetryPolicy, options: SearchOptions) -> Self {
        Self {
            searcher,
            policy,
            options,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fails only after every attempt has failed; the error carries the last cause.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult, RetrievalError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let backoff = self.policy.backoff(attempt);
            attempt += 1;
            tokio::time::sleep(backoff).await;

            let call = self.searcher.search(query, &self.options);
            let failure = match tokio::time::timeout(self.policy.attempt_timeout, call).await {
                Ok(Ok(documents)) => {
                    info!(query, attempt, documents = documents.len(), "Search succeeded");
                    return Ok(RetrievalResult { documents });
                }
                Ok(Err(e)) => AttemptFailure::Search(e),
                Err(_) => AttemptFailure::Timeout(self.policy.attempt_timeout),
            };

            if attempt >= max_attempts {
                return Err(RetrievalError {
                    query: query.to_string(),
                    attempts: attempt,
                    last: failure,
                });
            }

            warn!(
                query,
                attempt,
                max_attempts,
                reason = failure.reason(),
                error = %failure,
                next_backoff_ms = self.policy.backoff(attempt).as_millis() as u64,
                "Search attempt failed, retrying"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakySearcher, StalledSearcher};
    use deep_research_common::{Document, SearchError};
    use tokio::time::Instant;

    fn retriever(searcher: Arc<dyn WebSearcher>) -> Retriever {
        Retriever::new(searcher, RetryPolicy::default(), SearchOptions::default())
    }

    #[test]
    fn default_schedule_doubles_from_five_seconds() {
        let waits: Vec<u64> = RetryPolicy::default()
            .schedule()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(waits, vec![5_000, 10_000, 20_000, 40_000, 80_000]);
    }

    #[test]
    fn huge_attempt_counts_saturate() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(40), Duration::from_millis(5_000).saturating_mul(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_third_attempt() {
        let searcher = Arc::new(FlakySearcher::failing_times(
            2,
            vec![Document::new("https://sleep.example/caffeine", "Adenosine...")],
        ));
        let result = retriever(searcher.clone()).retrieve("caffeine sleep").await.unwrap();

        assert_eq!(result.documents.len(), 1);
        assert_eq!(searcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_double_between_attempts_until_exhausted() {
        let searcher = Arc::new(FlakySearcher::always_failing());
        let start = Instant::now();

        let err = retriever(searcher.clone()).retrieve("q").await.unwrap_err();

        assert_eq!(err.attempts, 5);
        assert_eq!(err.query, "q");
        assert_eq!(err.last, AttemptFailure::Search(SearchError::Failed("flaky".into())));

        let offsets: Vec<u64> = searcher
            .call_times()
            .iter()
            .map(|t| t.duration_since(start).as_secs())
            .collect();
        // 5s, then +10, +20, +40, +80
        assert_eq!(offsets, vec![5, 15, 35, 75, 155]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_attempts_time_out_and_are_retried() {
        let searcher = Arc::new(StalledSearcher::default());
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(10),
            attempt_timeout: Duration::from_secs(15),
        };
        let retriever = Retriever::new(searcher.clone(), policy, SearchOptions::default());

        let err = retriever.retrieve("slow").await.unwrap_err();

        assert_eq!(searcher.calls(), 2);
        assert_eq!(err.last, AttemptFailure::Timeout(Duration::from_secs(15)));
        assert_eq!(err.last.reason(), "timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let searcher = Arc::new(FlakySearcher::always_failing());
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let err = Retriever::new(searcher.clone(), policy, SearchOptions::default())
            .retrieve("q")
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(searcher.calls(), 1);
    }
}
