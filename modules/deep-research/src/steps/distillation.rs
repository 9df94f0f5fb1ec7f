use std::time::Duration;

use ai_client::truncate_chars;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info};

use deep_research_common::{Distillation, Document, GenerationError};

use crate::prompts;
use crate::steps::bounded;
use crate::traits::{generate_object, GenerationTask, StructuredGenerator};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct LearningsResponse {
    /// Concise, information-dense learnings drawn from the contents.
    learnings: Vec<String>,
    /// Questions that would push the research further.
    follow_up_questions: Vec<String>,
}

/// Character budgets applied to retrieved content before it reaches a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    /// Prefix kept from each document.
    pub per_document_chars: usize,
    /// Cap on all documents of one retrieval combined.
    pub total_chars: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            per_document_chars: 100_000,
            total_chars: 400_000,
        }
    }
}

impl ContextBudget {
    /// Non-empty document contents, each trimmed to its prefix budget, taken in
    /// order until the combined budget runs out.
    pub fn select<'a>(&self, documents: &'a [Document]) -> Vec<&'a str> {
        let mut remaining = self.total_chars;
        let mut contents = Vec::new();
        for doc in documents {
            if remaining == 0 {
                break;
            }
            let trimmed = doc.content.trim();
            if trimmed.is_empty() {
                continue;
            }
            let kept = truncate_chars(trimmed, self.per_document_chars.min(remaining));
            remaining -= kept.chars().count();
            contents.push(kept);
        }
        contents
    }
}

/// Turn one query's retrieved documents into learnings and follow-up questions.
pub async fn distill(
    generator: &dyn StructuredGenerator,
    query: &str,
    documents: &[Document],
    max_learnings: usize,
    max_follow_ups: usize,
    budget: &ContextBudget,
    timeout: Option<Duration>,
) -> Result<Distillation, GenerationError> {
    let contents = budget.select(documents);
    if contents.is_empty() {
        debug!(query, "No content to distill");
        return Ok(Distillation::default());
    }

    let response: LearningsResponse = generate_object(
        generator,
        GenerationTask::ExtractLearnings {
            max_learnings,
            max_follow_ups,
        },
        &prompts::system_prompt(),
        prompts::extract_learnings(query, &contents, max_learnings, max_follow_ups),
        timeout,
    )
    .await?;

    let distillation = Distillation {
        learnings: bounded(response.learnings, max_learnings),
        follow_up_questions: bounded(response.follow_up_questions, max_follow_ups),
    };
    info!(
        query,
        documents = contents.len(),
        learnings = distillation.learnings.len(),
        follow_ups = distillation.follow_up_questions.len(),
        "Distilled search results"
    );
    Ok(distillation)
}
