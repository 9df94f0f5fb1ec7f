//! Shared fixtures for the research integration tests.
//!
//! Everything runs against in-process mocks: `MockSearcher` for the web and a
//! `ScriptedGenerator` that answers each task with canned, prompt-derived JSON.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deep_research::testing::{prompt_query, prompt_subject, MockSearcher, ScriptedGenerator};
use deep_research::{
    GenerationRequest, GenerationTask, Orchestrator, ResearchOptions, Retriever, RetryPolicy, SearchOptions,
};
use deep_research_common::{Document, GenerationError};
use serde_json::{json, Value};

pub const CAFFEINE: &str = "impact of caffeine on sleep";

/// Sub-queries handed out when an expansion prompt starts with the given prefix.
pub type Expansion<'a> = (&'a str, &'a [(&'a str, &'a str)]);

pub const CAFFEINE_PLAN: &[(&str, &str)] = &[
    ("caffeine half-life", "How long caffeine stays active"),
    ("caffeine REM sleep", "Effect on sleep stages"),
];

pub fn generator(expansions: &[Expansion<'_>]) -> ScriptedGenerator {
    ScriptedGenerator::new(script(expansions))
}

/// Answers for every task. Expansion follows `expansions`; each extraction
/// yields four learnings named after its query (clamped downstream); each
/// revision is numbered.
pub fn script(
    expansions: &[Expansion<'_>],
) -> impl Fn(&GenerationRequest) -> Result<Value, GenerationError> + Send + Sync + 'static {
    let expansions: Vec<(String, Vec<(String, String)>)> = expansions
        .iter()
        .map(|(prefix, queries)| {
            let queries = queries
                .iter()
                .map(|(q, g)| (q.to_string(), g.to_string()))
                .collect();
            (prefix.to_string(), queries)
        })
        .collect();
    let revisions = AtomicUsize::new(0);

    move |req: &GenerationRequest| {
        let value = match req.task {
            GenerationTask::ExpandQuery { .. } => {
                let subject = prompt_subject(&req.prompt).unwrap_or_default();
                let queries: Vec<_> = expansions
                    .iter()
                    .find(|(prefix, _)| subject.starts_with(prefix.as_str()))
                    .map(|(_, queries)| queries.clone())
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(query, goal)| json!({ "query": query, "researchGoal": goal }))
                    .collect();
                json!({ "queries": queries })
            }
            GenerationTask::ExtractLearnings { .. } => {
                let query = prompt_query(&req.prompt).unwrap_or_default();
                let learnings: Vec<String> = (1..=4).map(|i| format!("{query}: fact {i}")).collect();
                json!({ "learnings": learnings, "followUpQuestions": ["what next?"] })
            }
            GenerationTask::ClarifyQuery { .. } => {
                json!({ "questions": ["Adults only?", "Any specific outcome?"] })
            }
            GenerationTask::Criticize => json!({ "criticism": "Lacks dosage data" }),
            GenerationTask::CritiqueQuestions { .. } => json!({
                "questions": ["What dose disrupts sleep?", "Does timing matter?", "Extra?"]
            }),
            GenerationTask::DraftReport => json!({ "reportMarkdown": "# Draft" }),
            GenerationTask::ReviseReport => {
                let n = revisions.fetch_add(1, Ordering::SeqCst) + 1;
                json!({ "reportMarkdown": format!("# Revision {n}") })
            }
            GenerationTask::SuggestFileName => json!({ "fileName": "Caffeine and Sleep" }),
        };
        Ok(value)
    }
}

/// Searcher returning one document per URL for each registered query.
pub fn searcher(results: &[(&str, &[&str])]) -> MockSearcher {
    results.iter().fold(MockSearcher::new(), |searcher, (query, urls)| {
        let documents = urls
            .iter()
            .map(|url| Document::new(*url, format!("{query} content from {url}")))
            .collect();
        searcher.on_search(query, documents)
    })
}

pub fn fast_retries() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(10),
        attempt_timeout: Duration::from_secs(15),
    }
}

pub fn orchestrator(generator: Arc<ScriptedGenerator>, searcher: Arc<MockSearcher>) -> Orchestrator {
    let retriever = Retriever::new(searcher, fast_retries(), SearchOptions::default());
    Orchestrator::new(generator, retriever, ResearchOptions::default())
}
