use std::fmt::Write;

use deep_research_common::{Budget, QuestionAnswer, RefinementStep, ResearchQuery};

/// `## Sources` section listing `urls` one per line, in the order given.
pub fn sources_section(urls: &[String]) -> String {
    let list: String = urls.iter().map(|url| format!("\n- {url}")).collect();
    format!("\n\n## Sources\n{list}")
}

/// Report body followed by its sources.
pub fn assemble_report(body: &str, urls: &[String]) -> String {
    format!("{}{}", body.trim_end(), sources_section(urls))
}

/// Everything about a run that is worth keeping next to the report.
#[derive(Debug, Clone, Copy)]
pub struct Metadata<'a> {
    pub query: &'a str,
    pub budget: Budget,
    pub feedback: &'a [QuestionAnswer],
    /// Top-level sub-queries, as expansion produced them.
    pub plan: &'a [ResearchQuery],
    pub learnings: &'a [String],
    pub visited_urls: &'a [String],
    pub steps: &'a [RefinementStep],
}

impl Metadata<'_> {
    pub fn render(&self) -> String {
        // Writing to a String cannot fail.
        let mut out = String::new();
        let _ = writeln!(out, "\n\n---\n\n## Research Metadata\n");
        let _ = writeln!(out, "- **Initial query:** {}", self.query);
        let _ = writeln!(out, "- **Breadth:** {}", self.budget.breadth);
        let _ = writeln!(out, "- **Depth:** {}", self.budget.depth);

        out.push_str("\n### Follow-up Questions\n\n");
        if self.feedback.is_empty() {
            out.push_str("_None asked._\n");
        }
        for qa in self.feedback {
            let _ = writeln!(out, "- **Q:** {}\n  **A:** {}", qa.question, qa.answer);
        }

        out.push_str("\n### Research Plan\n\n");
        for (i, q) in self.plan.iter().enumerate() {
            let _ = writeln!(out, "{}. {}\n   - Goal: {}", i + 1, q.text, q.research_goal);
        }

        out.push_str("\n### Learnings\n\n");
        for (i, learning) in self.learnings.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, learning);
        }

        out.push_str("\n### Visited URLs\n\n");
        for (i, url) in self.visited_urls.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, url);
        }

        if !self.steps.is_empty() {
            out.push_str("\n### Refinement Steps\n");
            for step in self.steps {
                let _ = writeln!(out, "\n#### Iteration {}\n", step.iteration);
                let _ = writeln!(out, "**Criticism:** {}\n", step.criticism);
                out.push_str("**Questions:**\n\n");
                for q in &step.questions {
                    let _ = writeln!(out, "- {q}");
                }
                let _ = writeln!(out, "\n**Report:**\n\n{}", step.report.trim_end());
            }
        }

        out
    }
}

/// The persisted document: body, sources, then metadata.
pub fn compose(body: &str, metadata: &Metadata<'_>) -> String {
    let mut document = assemble_report(body, metadata.visited_urls);
    document.push_str(&metadata.render());
    document
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_are_listed_in_input_order() {
        let urls = vec!["https://b.example".to_string(), "https://a.example".to_string()];
        assert_eq!(
            assemble_report("# Caffeine\n\nBody.\n\n", &urls),
            "# Caffeine\n\nBody.\n\n## Sources\n\n- https://b.example\n- https://a.example"
        );
    }

    #[test]
    fn empty_sources_keep_the_heading() {
        assert_eq!(assemble_report("Body", &[]), "Body\n\n## Sources\n");
    }

    #[test]
    fn metadata_enumerates_everything() {
        let feedback = vec![QuestionAnswer {
            question: "Adults only?".into(),
            answer: "Yes".into(),
        }];
        let plan = vec![ResearchQuery::new("caffeine half-life", "how long it lasts")];
        let learnings = vec!["Half-life is ~5h".to_string()];
        let urls = vec!["https://sleep.example".to_string()];
        let steps = vec![RefinementStep {
            iteration: 1,
            criticism: "No dosage data".into(),
            questions: vec!["What dose disrupts sleep?".into()],
            learnings: vec![],
            visited_urls: vec![],
            report: "# Revised".into(),
        }];
        let metadata = Metadata {
            query: "impact of caffeine on sleep",
            budget: Budget::new(2, 1),
            feedback: &feedback,
            plan: &plan,
            learnings: &learnings,
            visited_urls: &urls,
            steps: &steps,
        };

        let doc = compose("# Revised", &metadata);

        assert!(doc.starts_with("# Revised\n\n## Sources\n\n- https://sleep.example"));
        assert!(doc.contains("- **Initial query:** impact of caffeine on sleep"));
        assert!(doc.contains("- **Breadth:** 2\n- **Depth:** 1"));
        assert!(doc.contains("- **Q:** Adults only?\n  **A:** Yes"));
        assert!(doc.contains("1. caffeine half-life\n   - Goal: how long it lasts"));
        assert!(doc.contains("1. Half-life is ~5h"));
        assert!(doc.contains("1. https://sleep.example"));
        assert!(doc.contains("#### Iteration 1"));
        assert!(doc.contains("- What dose disrupts sleep?"));
    }
}
