use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use deep_research_common::{
    dedup_exact, Budget, QuestionAnswer, RefinementStep, ResearchError, ResearchQuery,
    DEFAULT_CONTEXT_CHARS,
};

use crate::assembly::{self, Metadata};
use crate::orchestrator::Orchestrator;
use crate::prompts;
use crate::refinement::Refiner;
use crate::steps::report::{draft_report, slugify, suggest_file_name};
use crate::steps::{clarifying_questions, FeedbackSource, SkipFeedback};
use crate::traits::StructuredGenerator;

/// What to research and how hard to try.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResearchRequest {
    #[builder(setter(into))]
    pub query: String,
    #[builder(default = 4)]
    pub breadth: usize,
    #[builder(default = 2)]
    pub depth: usize,
    #[builder(default = 0)]
    pub refine_iterations: usize,
    #[builder(default = 3)]
    pub clarifying_questions: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct ResearchRun {
    pub query: String,
    pub budget: Budget,
    pub feedback: Vec<QuestionAnswer>,
    /// Top-level sub-queries of the initial research pass.
    pub plan: Vec<ResearchQuery>,
    /// Initial research and refinement learnings, deduplicated.
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    /// Final report body, without sources.
    pub report: String,
    pub steps: Vec<RefinementStep>,
    pub file_name: String,
}

impl ResearchRun {
    pub fn metadata(&self) -> Metadata<'_> {
        Metadata {
            query: &self.query,
            budget: self.budget,
            feedback: &self.feedback,
            plan: &self.plan,
            learnings: &self.learnings,
            visited_urls: &self.visited_urls,
            steps: &self.steps,
        }
    }

    /// The full markdown document: report, sources, metadata.
    pub fn document(&self) -> String {
        assembly::compose(&self.report, &self.metadata())
    }
}

/// End-to-end run: clarify, research, draft, refine, name.
pub struct DeepResearch {
    generator: Arc<dyn StructuredGenerator>,
    orchestrator: Arc<Orchestrator>,
    feedback: Arc<dyn FeedbackSource>,
    context_chars: usize,
    cancel: CancellationToken,
}

impl DeepResearch {
    pub fn new(generator: Arc<dyn StructuredGenerator>, orchestrator: Orchestrator) -> Self {
        Self {
            generator,
            orchestrator: Arc::new(orchestrator),
            feedback: Arc::new(SkipFeedback),
            context_chars: DEFAULT_CONTEXT_CHARS,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackSource>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    /// Abandon the run, including any in-flight generation call, once `cancel`
    /// fires. Pass the orchestrator the same token to stop queued research units.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, request: &ResearchRequest) -> Result<ResearchRun, ResearchError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Research cancelled");
                Err(ResearchError::Cancelled)
            }
            run = self.run_phases(request) => run,
        }
    }

    async fn run_phases(&self, request: &ResearchRequest) -> Result<ResearchRun, ResearchError> {
        let generator = self.generator.as_ref();
        let budget = Budget::new(request.breadth, request.depth);

        let feedback = self.collect_feedback(&request.query, request.clarifying_questions).await?;
        let query = prompts::combined_query(&request.query, &feedback);

        info!(
            breadth = budget.breadth,
            depth = budget.depth,
            refine = request.refine_iterations,
            "Starting research"
        );
        let research = self
            .orchestrator
            .research(&query, budget.breadth, budget.depth)
            .await?;
        info!(
            learnings = research.learnings.len(),
            urls = research.visited_urls.len(),
            "Initial research complete"
        );

        let draft = draft_report(generator, &query, &research.learnings, self.context_chars).await?;

        let refiner = Refiner::new(self.generator.clone(), self.orchestrator.clone())
            .with_context_chars(self.context_chars);
        let refined = refiner
            .run(draft, &query, budget, request.refine_iterations)
            .await?;

        let learnings = dedup_exact(research.learnings.into_iter().chain(refined.learnings));
        let visited_urls = dedup_exact(research.visited_urls.into_iter().chain(refined.visited_urls));

        let file_name = match suggest_file_name(generator, &request.query).await {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "File name suggestion failed, using fallback");
                slugify("")
            }
        };

        Ok(ResearchRun {
            query: request.query.clone(),
            budget,
            feedback,
            plan: research.queries,
            learnings,
            visited_urls,
            report: refined.report.markdown,
            steps: refined.steps,
            file_name,
        })
    }

    async fn collect_feedback(
        &self,
        query: &str,
        max_questions: usize,
    ) -> Result<Vec<QuestionAnswer>, ResearchError> {
        if !self.feedback.enabled() || max_questions == 0 {
            return Ok(Vec::new());
        }

        let questions = clarifying_questions(self.generator.as_ref(), query, max_questions).await?;
        let mut answers = Vec::with_capacity(questions.len());
        for question in questions {
            let answer = self
                .feedback
                .answer(&question)
                .await
                .map_err(ResearchError::Feedback)?;
            answers.push(QuestionAnswer {
                question,
                answer: answer.trim().to_string(),
            });
        }
        Ok(answers)
    }
}
