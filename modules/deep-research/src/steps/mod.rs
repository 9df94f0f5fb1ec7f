//! Single round trips to the inference service. None of these retry: a
//! `GenerationError` goes straight back to the caller.

pub mod clarify;
pub mod distillation;
pub mod expansion;
pub mod report;

pub use clarify::{clarifying_questions, FeedbackSource, SkipFeedback};
pub use distillation::{distill, ContextBudget};
pub use expansion::expand_query;

/// Drop blank entries and clamp a generated list to the requested bound.
pub(crate) fn bounded(items: Vec<String>, max: usize) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(max)
        .collect()
}
