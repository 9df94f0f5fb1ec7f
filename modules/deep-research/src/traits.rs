// Trait seams for the two external services research depends on.
//
// WebSearcher: search + scrape one query into documents (Firecrawl in production).
// StructuredGenerator: prompt + JSON schema in, JSON value out (OpenAI or Claude).
//
// Both are object safe and shared across concurrent branches behind an Arc, so
// implementations must be stateless per call. Mocks live in `testing.rs`.

use std::time::Duration;

use ai_client::{AiError, Claude, OpenAi, StructuredOutput};
use async_trait::async_trait;
use firecrawl_client::{ContentFormat, FirecrawlClient, FirecrawlError, SearchHit};
use serde_json::Value;

use deep_research_common::{Document, GenerationError, SearchError};

// ---------------------------------------------------------------------------
// WebSearcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: usize,
    pub timeout: Duration,
    pub formats: Vec<ContentFormat>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            timeout: Duration::from_secs(15),
            formats: vec![ContentFormat::Markdown],
        }
    }
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Run one search and return the scraped result pages.
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Document>, SearchError>;
}

#[async_trait]
impl WebSearcher for FirecrawlClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Document>, SearchError> {
        let hits = FirecrawlClient::search(self, query, options.limit, options.timeout, &options.formats)
            .await
            .map_err(|e| match e {
                FirecrawlError::Timeout(_) => SearchError::Timeout,
                other => SearchError::Failed(other.to_string()),
            })?;

        Ok(hits.into_iter().map(document_from_hit).collect())
    }
}

/// Scraped markdown, or the search snippet when the page could not be scraped.
fn document_from_hit(hit: SearchHit) -> Document {
    let content = hit
        .markdown
        .filter(|markdown| !markdown.trim().is_empty())
        .or(hit.description)
        .unwrap_or_default();
    Document { url: hit.url, content }
}

// ---------------------------------------------------------------------------
// StructuredGenerator
// ---------------------------------------------------------------------------

/// The call shapes research makes against the inference service, with the list
/// bounds each one was asked to respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationTask {
    ClarifyQuery { max_questions: usize },
    ExpandQuery { max_queries: usize },
    ExtractLearnings { max_learnings: usize, max_follow_ups: usize },
    Criticize,
    CritiqueQuestions { max_questions: usize },
    DraftReport,
    ReviseReport,
    SuggestFileName,
}

impl GenerationTask {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationTask::ClarifyQuery { .. } => "clarify_query",
            GenerationTask::ExpandQuery { .. } => "expand_query",
            GenerationTask::ExtractLearnings { .. } => "extract_learnings",
            GenerationTask::Criticize => "criticize_report",
            GenerationTask::CritiqueQuestions { .. } => "critique_questions",
            GenerationTask::DraftReport => "draft_report",
            GenerationTask::ReviseReport => "revise_report",
            GenerationTask::SuggestFileName => "suggest_file_name",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task: GenerationTask,
    pub system: String,
    pub prompt: String,
    pub schema: Value,
}

#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    /// One round trip: returns a JSON value that should match `request.schema`.
    async fn generate(&self, request: GenerationRequest) -> Result<Value, GenerationError>;
}

/// Typed boundary over [`StructuredGenerator`]: derives the schema from `T`,
/// enforces `timeout`, and rejects responses that don't deserialize into `T`.
pub async fn generate_object<T: StructuredOutput>(
    generator: &dyn StructuredGenerator,
    task: GenerationTask,
    system: &str,
    prompt: String,
    timeout: Option<Duration>,
) -> Result<T, GenerationError> {
    let request = GenerationRequest {
        task,
        system: system.to_string(),
        prompt,
        schema: T::strict_schema(),
    };

    let call = generator.generate(request);
    let value = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| GenerationError::Timeout {
                task: task.name().to_string(),
                timeout: limit,
            })??,
        None => call.await?,
    };

    serde_json::from_value(value).map_err(|e| GenerationError::Malformed {
        task: task.name().to_string(),
        message: e.to_string(),
    })
}

fn provider_error(task: GenerationTask, err: AiError) -> GenerationError {
    match err {
        AiError::Parse(message) => GenerationError::Malformed {
            task: task.name().to_string(),
            message,
        },
        other => GenerationError::Provider {
            task: task.name().to_string(),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl StructuredGenerator for OpenAi {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, GenerationError> {
        self.extract_value(request.task.name(), &request.system, &request.prompt, request.schema)
            .await
            .map_err(|e| provider_error(request.task, e))
    }
}

#[async_trait]
impl StructuredGenerator for Claude {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, GenerationError> {
        self.extract_value(request.task.name(), &request.system, &request.prompt, request.schema)
            .await
            .map_err(|e| provider_error(request.task, e))
    }
}
