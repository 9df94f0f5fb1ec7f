use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Queries ---

/// A sub-query produced by query expansion, with the goal it is meant to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchQuery {
    /// The search query to run.
    #[serde(rename = "query")]
    pub text: String,
    /// What this query should uncover, and how to push the research further once
    /// results come back.
    pub research_goal: String,
}

impl ResearchQuery {
    pub fn new(text: impl Into<String>, research_goal: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            research_goal: research_goal.into(),
        }
    }
}

// --- Retrieval ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub content: String,
}

impl Document {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalResult {
    pub documents: Vec<Document>,
}

impl RetrievalResult {
    /// Non-empty URLs of the retrieved documents, exact duplicates removed.
    pub fn urls(&self) -> Vec<String> {
        dedup_exact(
            self.documents
                .iter()
                .filter(|d| !d.url.is_empty())
                .map(|d| d.url.clone()),
        )
    }
}

// --- Distillation ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distillation {
    pub learnings: Vec<String>,
    pub follow_up_questions: Vec<String>,
}

// --- Research ---

/// Breadth/depth budget carried by value through the recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub breadth: usize,
    pub depth: usize,
}

impl Budget {
    /// Breadth is clamped to at least one sub-query per level.
    pub fn new(breadth: usize, depth: usize) -> Self {
        Self {
            breadth: breadth.max(1),
            depth,
        }
    }

    /// Budget handed to the next level: breadth halved (rounding up), one level
    /// fewer remaining.
    pub fn descend(self) -> Self {
        Self {
            breadth: self.breadth.div_ceil(2),
            depth: self.depth.saturating_sub(1),
        }
    }

    pub fn has_remaining_depth(&self) -> bool {
        self.depth > 0
    }
}

/// Aggregate returned by every level of the research recursion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchResult {
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    pub queries: Vec<ResearchQuery>,
}

impl ResearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Union several results. Learnings and URLs are deduplicated by exact string
    /// match; `queries` is supplied by the caller rather than merged.
    pub fn union(results: impl IntoIterator<Item = ResearchResult>, queries: Vec<ResearchQuery>) -> Self {
        let mut learnings = Vec::new();
        let mut visited_urls = Vec::new();
        for result in results {
            learnings.extend(result.learnings);
            visited_urls.extend(result.visited_urls);
        }
        Self {
            learnings: dedup_exact(learnings),
            visited_urls: dedup_exact(visited_urls),
            queries,
        }
    }
}

// --- Report ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDraft {
    pub markdown: String,
}

impl ReportDraft {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

/// One critique, questions, research and revision cycle, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementStep {
    pub iteration: usize,
    pub criticism: String,
    pub questions: Vec<String>,
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    /// Full revised report text produced by this iteration.
    pub report: String,
}

/// Remove exact duplicates, keeping the first occurrence of each entry.
pub fn dedup_exact(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
