// Test mocks for the research pipeline.
//
// One or more mocks per trait boundary:
// - MockSearcher (WebSearcher): HashMap-based query→documents, optional latency
// - FlakySearcher (WebSearcher): fails N times, then succeeds; records call times
// - StalledSearcher (WebSearcher): never answers
// - ScriptedGenerator (StructuredGenerator): closure over the request, records every call
// - ScriptedFeedback (FeedbackSource): canned answers in order

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use deep_research_common::{Document, GenerationError, SearchError};

use crate::steps::FeedbackSource;
use crate::traits::{GenerationRequest, GenerationTask, SearchOptions, StructuredGenerator, WebSearcher};

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

/// HashMap-based searcher. Returns `Err` for unregistered queries.
/// Builder pattern: `.on_search()`, `.failing()`, `.with_latency()`.
#[derive(Default)]
pub struct MockSearcher {
    results: HashMap<String, Vec<Document>>,
    failing: Vec<String>,
    latency: Option<Duration>,
    queries: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_search(mut self, query: &str, documents: Vec<Document>) -> Self {
        self.results.insert(query.to_string(), documents);
        self
    }

    /// Queries whose search always fails, even if registered.
    pub fn failing(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    /// Each call sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queries searched so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Highest number of searches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &str, _options: &SearchOptions) -> Result<Vec<Document>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|q| q == query) {
            return Err(SearchError::Failed(format!("MockSearcher: {query} is set to fail")));
        }
        self.results
            .get(query)
            .cloned()
            .ok_or_else(|| SearchError::Failed(format!("MockSearcher: no search registered for {query}")))
    }
}

// ---------------------------------------------------------------------------
// FlakySearcher
// ---------------------------------------------------------------------------

/// Fails a fixed number of times before returning its documents.
pub struct FlakySearcher {
    failures: Option<usize>,
    documents: Vec<Document>,
    calls: Mutex<Vec<Instant>>,
}

impl FlakySearcher {
    pub fn failing_times(failures: usize, documents: Vec<Document>) -> Self {
        Self {
            failures: Some(failures),
            documents,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self {
            failures: None,
            documents: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for FlakySearcher {
    async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<Vec<Document>, SearchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            calls.len()
        };
        match self.failures {
            Some(failures) if call > failures => Ok(self.documents.clone()),
            _ => Err(SearchError::Failed("flaky".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// StalledSearcher
// ---------------------------------------------------------------------------

/// Never returns. Every attempt runs into the retrieval timeout.
#[derive(Default)]
pub struct StalledSearcher {
    calls: AtomicUsize,
}

impl StalledSearcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearcher for StalledSearcher {
    async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<Vec<Document>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

type Script = dyn Fn(&GenerationRequest) -> Result<Value, GenerationError> + Send + Sync;

/// Answers every request through a closure and records what was asked.
pub struct ScriptedGenerator {
    script: Box<Script>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(
        script: impl Fn(&GenerationRequest) -> Result<Value, GenerationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn tasks(&self) -> Vec<GenerationTask> {
        self.requests().into_iter().map(|r| r.task).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.prompt).collect()
    }

    /// Number of calls made for tasks with this name.
    pub fn count(&self, task_name: &str) -> usize {
        self.tasks().iter().filter(|t| t.name() == task_name).count()
    }
}

#[async_trait]
impl StructuredGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, GenerationError> {
        let response = (self.script)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

// ---------------------------------------------------------------------------
// ScriptedFeedback
// ---------------------------------------------------------------------------

/// Hands out canned answers in order, then empty strings.
pub struct ScriptedFeedback {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedFeedback {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedbackSource for ScriptedFeedback {
    async fn answer(&self, question: &str) -> std::io::Result<String> {
        self.asked.lock().unwrap().push(question.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The text inside `<query>...</query>` of a learnings-extraction prompt.
pub fn prompt_query(prompt: &str) -> Option<&str> {
    let start = prompt.find("<query>")? + "<query>".len();
    let end = prompt[start..].find("</query>")? + start;
    Some(&prompt[start..end])
}

/// The text inside `<prompt>...</prompt>` of an expansion or report prompt.
pub fn prompt_subject(prompt: &str) -> Option<&str> {
    let start = prompt.find("<prompt>")? + "<prompt>".len();
    let end = prompt[start..].find("</prompt>")? + start;
    Some(&prompt[start..end])
}
