use ai_client::truncate_chars;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use deep_research_common::{GenerationError, ReportDraft};

use crate::prompts;
use crate::steps::bounded;
use crate::traits::{generate_object, GenerationTask, StructuredGenerator};

const FALLBACK_FILE_NAME: &str = "research-report";
const MAX_FILE_NAME_CHARS: usize = 60;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    /// The complete report in markdown.
    report_markdown: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CriticismResponse {
    /// Specific, actionable criticism of the report.
    criticism: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CritiqueQuestions {
    /// Research questions whose answers would address the criticism.
    questions: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct FileNameResponse {
    /// Short lowercase file name with words separated by hyphens.
    file_name: String,
}

fn non_empty_report(task: GenerationTask, markdown: String) -> Result<ReportDraft, GenerationError> {
    if markdown.trim().is_empty() {
        return Err(GenerationError::Malformed {
            task: task.name().to_string(),
            message: "empty report".to_string(),
        });
    }
    Ok(ReportDraft::new(markdown))
}

/// First draft of the report from everything research learned.
pub async fn draft_report(
    generator: &dyn StructuredGenerator,
    query: &str,
    learnings: &[String],
    context_chars: usize,
) -> Result<ReportDraft, GenerationError> {
    let block = prompts::learnings_block(learnings);
    let learnings = truncate_chars(&block, context_chars);

    let task = GenerationTask::DraftReport;
    let response: ReportResponse = generate_object(
        generator,
        task,
        &prompts::system_prompt(),
        prompts::draft_report(query, learnings),
        None,
    )
    .await?;

    let draft = non_empty_report(task, response.report_markdown)?;
    info!(chars = draft.markdown.len(), "Drafted report");
    Ok(draft)
}

/// Free-form criticism of a report.
pub async fn criticize_report(
    generator: &dyn StructuredGenerator,
    query: &str,
    report: &ReportDraft,
) -> Result<String, GenerationError> {
    let response: CriticismResponse = generate_object(
        generator,
        GenerationTask::Criticize,
        &prompts::system_prompt(),
        prompts::criticize_report(query, &report.markdown),
        None,
    )
    .await?;
    Ok(response.criticism.trim().to_string())
}

/// Up to `max_questions` research questions addressing `criticism`.
pub async fn critique_questions(
    generator: &dyn StructuredGenerator,
    criticism: &str,
    max_questions: usize,
) -> Result<Vec<String>, GenerationError> {
    let response: CritiqueQuestions = generate_object(
        generator,
        GenerationTask::CritiqueQuestions { max_questions },
        &prompts::system_prompt(),
        prompts::critique_questions(criticism, max_questions),
        None,
    )
    .await?;
    Ok(bounded(response.questions, max_questions))
}

/// Full replacement of `report` that folds in `learnings`.
pub async fn revise_report(
    generator: &dyn StructuredGenerator,
    query: &str,
    report: &ReportDraft,
    learnings: &[String],
    context_chars: usize,
) -> Result<ReportDraft, GenerationError> {
    let block = prompts::learnings_block(learnings);
    let learnings = truncate_chars(&block, context_chars);

    let task = GenerationTask::ReviseReport;
    let response: ReportResponse = generate_object(
        generator,
        task,
        &prompts::system_prompt(),
        prompts::revise_report(query, &report.markdown, learnings),
        None,
    )
    .await?;
    non_empty_report(task, response.report_markdown)
}

/// Ask for a file name and reduce it to a safe slug.
pub async fn suggest_file_name(
    generator: &dyn StructuredGenerator,
    query: &str,
) -> Result<String, GenerationError> {
    let response: FileNameResponse = generate_object(
        generator,
        GenerationTask::SuggestFileName,
        &prompts::system_prompt(),
        prompts::suggest_file_name(query),
        None,
    )
    .await?;
    Ok(slugify(&response.file_name))
}

/// Lowercase `[a-z0-9-]` slug, at most 60 chars, never empty.
pub fn slugify(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.strip_suffix(".md").unwrap_or(raw);

    let mut slug = String::new();
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug: String = slug.chars().take(MAX_FILE_NAME_CHARS).collect();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;
    use serde_json::json;

    #[test]
    fn slugify_cleans_model_output() {
        assert_eq!(slugify("Caffeine & Sleep: A Review.md"), "caffeine-sleep-a-review");
        assert_eq!(slugify("  ../../etc/passwd "), "etc-passwd");
        assert_eq!(slugify("???"), FALLBACK_FILE_NAME);
        assert_eq!(slugify(&"a".repeat(100)).len(), MAX_FILE_NAME_CHARS);
    }

    #[tokio::test]
    async fn blank_report_is_rejected() {
        let generator = ScriptedGenerator::new(|_| Ok(json!({ "reportMarkdown": "  \n" })));
        let err = draft_report(&generator, "q", &["l".to_string()], 1_000).await.unwrap_err();
        assert!(matches!(err, GenerationError::Malformed { ref task, .. } if task == "draft_report"));
    }

    #[tokio::test]
    async fn draft_prompt_carries_bounded_learnings() {
        let generator = ScriptedGenerator::new(|_| Ok(json!({ "reportMarkdown": "# Report" })));
        let learnings = vec!["caffeine half-life ~5h".to_string(), "x".repeat(500)];

        let draft = draft_report(&generator, "q", &learnings, 60).await.unwrap();

        assert_eq!(draft.markdown, "# Report");
        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("caffeine half-life ~5h"));
        assert!(!prompt.contains(&"x".repeat(100)));
    }

    #[tokio::test]
    async fn critique_questions_are_bounded() {
        let generator = ScriptedGenerator::new(|_| Ok(json!({ "questions": ["a", "b", "c"] })));
        let questions = critique_questions(&generator, "thin on dosage", 2).await.unwrap();
        assert_eq!(questions, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn file_name_is_slugified() {
        let generator = ScriptedGenerator::new(|_| Ok(json!({ "fileName": "Caffeine_Sleep Impact" })));
        let name = suggest_file_name(&generator, "q").await.unwrap();
        assert_eq!(name, "caffeine-sleep-impact");
    }
}
