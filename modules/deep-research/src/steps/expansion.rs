use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use deep_research_common::{GenerationError, ResearchQuery};

use crate::prompts;
use crate::traits::{generate_object, GenerationTask, StructuredGenerator};

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchQueries {
    /// Search queries, no more than the number requested.
    queries: Vec<ResearchQuery>,
}

/// Expand `query` into at most `max_queries` sub-queries, each with a research goal.
/// Order is kept as the model produced it.
pub async fn expand_query(
    generator: &dyn StructuredGenerator,
    query: &str,
    learnings: &[String],
    max_queries: usize,
) -> Result<Vec<ResearchQuery>, GenerationError> {
    let response: SearchQueries = generate_object(
        generator,
        GenerationTask::ExpandQuery { max_queries },
        &prompts::system_prompt(),
        prompts::expand_query(query, learnings, max_queries),
        None,
    )
    .await?;

    let generated = response.queries.len();
    let queries: Vec<ResearchQuery> = response
        .queries
        .into_iter()
        .filter(|q| !q.text.trim().is_empty())
        .take(max_queries)
        .collect();

    info!(
        requested = max_queries,
        generated,
        kept = queries.len(),
        "Expanded query into search queries"
    );
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;
    use serde_json::json;

    #[tokio::test]
    async fn clamps_to_requested_breadth_and_keeps_order() {
        let generator = ScriptedGenerator::new(|_| {
            Ok(json!({ "queries": [
                { "query": "caffeine half-life", "researchGoal": "g1" },
                { "query": "", "researchGoal": "blank" },
                { "query": "caffeine REM sleep", "researchGoal": "g2" },
                { "query": "caffeine tolerance", "researchGoal": "g3" },
            ]}))
        });

        let queries = expand_query(&generator, "impact of caffeine on sleep", &[], 2)
            .await
            .unwrap();

        assert_eq!(
            queries,
            vec![
                ResearchQuery::new("caffeine half-life", "g1"),
                ResearchQuery::new("caffeine REM sleep", "g2"),
            ]
        );
        assert_eq!(
            generator.tasks(),
            vec![GenerationTask::ExpandQuery { max_queries: 2 }]
        );
    }

    #[tokio::test]
    async fn missing_goal_is_malformed() {
        let generator = ScriptedGenerator::new(|_| Ok(json!({ "queries": [{ "query": "x" }] })));
        let err = expand_query(&generator, "q", &[], 3).await.unwrap_err();
        assert!(matches!(err, GenerationError::Malformed { .. }));
    }
}
