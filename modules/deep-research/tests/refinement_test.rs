//! Critique → questions → research → revise, iterated.

mod harness;

use std::sync::Arc;

use deep_research::{GenerationTask, Refiner};
use deep_research_common::{Budget, ReportDraft};

use harness::{generator, orchestrator, searcher, CAFFEINE};

const REFINEMENT_PLAN: &[(&str, &str)] = &[("caffeine dose response", "Which doses matter")];

fn refiner() -> (Refiner, Arc<deep_research::testing::ScriptedGenerator>) {
    let generator = Arc::new(generator(&[("Original research prompt", REFINEMENT_PLAN)]));
    let searcher = Arc::new(searcher(&[(
        "caffeine dose response",
        &["https://dose.example/study"],
    )]));
    let orchestrator = Arc::new(orchestrator(generator.clone(), searcher));
    (Refiner::new(generator.clone(), orchestrator), generator)
}

#[tokio::test(start_paused = true)]
async fn zero_iterations_return_the_draft_untouched() {
    let (refiner, generator) = refiner();
    let draft = ReportDraft::new("# Draft\n\nCaffeine blocks adenosine.");

    let outcome = refiner
        .run(draft.clone(), CAFFEINE, Budget::new(2, 0), 0)
        .await
        .unwrap();

    assert_eq!(outcome.report, draft);
    assert!(outcome.steps.is_empty());
    assert!(outcome.learnings.is_empty());
    assert!(outcome.visited_urls.is_empty());
    assert!(generator.tasks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn each_iteration_revises_the_previous_report() {
    let (refiner, generator) = refiner();

    let outcome = refiner
        .run(ReportDraft::new("# Draft"), CAFFEINE, Budget::new(2, 0), 2)
        .await
        .unwrap();

    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.steps[0].report, "# Revision 1");
    assert_eq!(outcome.steps[1].report, "# Revision 2");
    assert_eq!(outcome.report, ReportDraft::new("# Revision 2"));
    assert_eq!(
        outcome.steps.iter().map(|s| s.iteration).collect::<Vec<_>>(),
        vec![1, 2]
    );

    // the second revision is asked to improve the first one
    let revise_prompts: Vec<String> = generator
        .requests()
        .into_iter()
        .filter(|r| r.task == GenerationTask::ReviseReport)
        .map(|r| r.prompt)
        .collect();
    assert!(revise_prompts[0].contains("<report>\n# Draft\n</report>"));
    assert!(revise_prompts[1].contains("<report>\n# Revision 1\n</report>"));
    assert!(revise_prompts[1].contains("caffeine dose response: fact 1"));
}

#[tokio::test(start_paused = true)]
async fn questions_are_bounded_by_breadth_and_feed_the_research_query() {
    let (refiner, generator) = refiner();

    let step = refiner
        .refine(&ReportDraft::new("# Draft"), CAFFEINE, Budget::new(2, 0), 1)
        .await
        .unwrap();

    assert_eq!(step.criticism, "Lacks dosage data");
    assert_eq!(
        step.questions,
        vec!["What dose disrupts sleep?", "Does timing matter?"]
    );
    assert_eq!(step.visited_urls, vec!["https://dose.example/study"]);
    assert_eq!(step.learnings.len(), 3);

    let expansion = generator
        .requests()
        .into_iter()
        .find(|r| matches!(r.task, GenerationTask::ExpandQuery { .. }))
        .unwrap();
    assert!(expansion.prompt.contains(CAFFEINE));
    assert!(expansion.prompt.contains("Lacks dosage data"));
    assert!(expansion.prompt.contains("- What dose disrupts sleep?"));
    assert_eq!(
        generator.tasks().first(),
        Some(&GenerationTask::Criticize)
    );
}

#[tokio::test(start_paused = true)]
async fn refinement_sources_are_reported() {
    let (refiner, _) = refiner();

    let outcome = refiner
        .run(ReportDraft::new("# Draft"), CAFFEINE, Budget::new(1, 0), 2)
        .await
        .unwrap();

    // both iterations hit the same source; the outcome lists it once
    assert_eq!(outcome.visited_urls, vec!["https://dose.example/study"]);
    assert_eq!(outcome.learnings.len(), 3);
}
