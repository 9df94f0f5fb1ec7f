use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use deep_research_common::GenerationError;

use crate::prompts;
use crate::steps::bounded;
use crate::traits::{generate_object, GenerationTask, StructuredGenerator};

#[derive(Debug, Deserialize, JsonSchema)]
struct ClarifyingQuestions {
    /// Follow-up questions that would clarify the research direction.
    questions: Vec<String>,
}

/// Ask the model which questions would sharpen `query` before research starts.
pub async fn clarifying_questions(
    generator: &dyn StructuredGenerator,
    query: &str,
    max_questions: usize,
) -> Result<Vec<String>, GenerationError> {
    let response: ClarifyingQuestions = generate_object(
        generator,
        GenerationTask::ClarifyQuery { max_questions },
        &prompts::system_prompt(),
        prompts::clarify_query(query, max_questions),
        None,
    )
    .await?;

    let questions = bounded(response.questions, max_questions);
    info!(count = questions.len(), "Generated clarifying questions");
    Ok(questions)
}

/// Where answers to clarifying questions come from.
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    /// Whether to ask at all. When false the clarifying step is skipped entirely.
    fn enabled(&self) -> bool {
        true
    }

    async fn answer(&self, question: &str) -> std::io::Result<String>;
}

/// Non-interactive runs: no clarifying questions.
pub struct SkipFeedback;

#[async_trait]
impl FeedbackSource for SkipFeedback {
    fn enabled(&self) -> bool {
        false
    }

    async fn answer(&self, _question: &str) -> std::io::Result<String> {
        Ok(String::new())
    }
}
