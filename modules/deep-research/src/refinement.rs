use std::sync::Arc;

use tracing::info;

use deep_research_common::{
    dedup_exact, Budget, RefinementStep, ReportDraft, ResearchError, DEFAULT_CONTEXT_CHARS,
};

use crate::orchestrator::Orchestrator;
use crate::prompts;
use crate::steps::report::{criticize_report, critique_questions, revise_report};
use crate::traits::StructuredGenerator;

/// Where a run of refinement iterations ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementOutcome {
    pub report: ReportDraft,
    /// One entry per iteration, in order. Empty when no iterations ran.
    pub steps: Vec<RefinementStep>,
    /// Learnings gathered across all iterations, deduplicated.
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
}

/// Critique → questions → research → revise, applied to a report draft.
pub struct Refiner {
    generator: Arc<dyn StructuredGenerator>,
    orchestrator: Arc<Orchestrator>,
    context_chars: usize,
}

impl Refiner {
    pub fn new(generator: Arc<dyn StructuredGenerator>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            generator,
            orchestrator,
            context_chars: DEFAULT_CONTEXT_CHARS,
        }
    }

    /// Character budget for the learnings embedded in revision prompts.
    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    /// One iteration. The returned step holds the full revised report.
    pub async fn refine(
        &self,
        report: &ReportDraft,
        initial_query: &str,
        budget: Budget,
        iteration: usize,
    ) -> Result<RefinementStep, ResearchError> {
        let generator = self.generator.as_ref();

        let criticism = criticize_report(generator, initial_query, report).await?;
        let questions = critique_questions(generator, &criticism, budget.breadth).await?;

        let query = prompts::refinement_query(initial_query, &criticism, &questions);
        let research = self
            .orchestrator
            .research(&query, budget.breadth, budget.depth)
            .await?;

        let revised = revise_report(
            generator,
            initial_query,
            report,
            &research.learnings,
            self.context_chars,
        )
        .await?;

        info!(
            iteration,
            questions = questions.len(),
            learnings = research.learnings.len(),
            urls = research.visited_urls.len(),
            "Refined report"
        );

        Ok(RefinementStep {
            iteration,
            criticism,
            questions,
            learnings: research.learnings,
            visited_urls: research.visited_urls,
            report: revised.markdown,
        })
    }

    /// Run `iterations` refinements in sequence, each revising the previous output.
    pub async fn run(
        &self,
        draft: ReportDraft,
        initial_query: &str,
        budget: Budget,
        iterations: usize,
    ) -> Result<RefinementOutcome, ResearchError> {
        let mut report = draft;
        let mut steps = Vec::with_capacity(iterations);

        for iteration in 1..=iterations {
            let step = self.refine(&report, initial_query, budget, iteration).await?;
            report = ReportDraft::new(step.report.clone());
            steps.push(step);
        }

        let learnings = dedup_exact(steps.iter().flat_map(|s| s.learnings.iter().cloned()));
        let visited_urls = dedup_exact(steps.iter().flat_map(|s| s.visited_urls.iter().cloned()));
        Ok(RefinementOutcome {
            report,
            steps,
            learnings,
            visited_urls,
        })
    }
}
