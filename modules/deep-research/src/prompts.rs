use chrono::Utc;

use deep_research_common::QuestionAnswer;

/// System prompt shared by every research call. Carries today's date so the
/// model accepts results newer than its training data.
pub fn system_prompt() -> String {
    format!(
        "You are an expert researcher. Today is {}. Follow these instructions when responding:\n\
         - You may be asked about events after your knowledge cutoff; when search results report news, assume they are right.\n\
         - The reader is an experienced analyst. Do not simplify; be as detailed and precise as possible.\n\
         - Be highly organized.\n\
         - Suggest angles and solutions the reader has not considered.\n\
         - Accuracy matters more than fluency. Flag speculation explicitly.\n\
         - Weigh arguments on their merits rather than on the authority of the source.\n\
         - Consider new technologies and contrarian ideas, not only conventional wisdom.",
        Utc::now().format("%Y-%m-%d")
    )
}

pub fn clarify_query(query: &str, max_questions: usize) -> String {
    format!(
        "Given the following query from the user, ask some follow up questions to clarify the research direction. \
         Return a maximum of {max_questions} questions, but feel free to return none if the original query is clear: \
         <query>{query}</query>"
    )
}

/// Research query sent to the orchestrator once clarifying answers are known.
pub fn combined_query(query: &str, feedback: &[QuestionAnswer]) -> String {
    if feedback.is_empty() {
        return query.to_string();
    }
    let transcript = feedback
        .iter()
        .map(|qa| format!("Q: {}\nA: {}", qa.question, qa.answer))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Initial Query: {query}\nFollow-up Questions and Answers:\n{transcript}")
}

pub fn expand_query(query: &str, learnings: &[String], max_queries: usize) -> String {
    let mut prompt = format!(
        "Given the following prompt from the user, generate a list of search engine queries to research the topic. \
         Return a maximum of {max_queries} queries, but feel free to return fewer if the original prompt is clear. \
         Make sure each query is unique and not similar to the others: <prompt>{query}</prompt>"
    );
    if !learnings.is_empty() {
        prompt.push_str(&format!(
            "\n\nHere are some learnings from previous research, use them to generate more specific queries: {}",
            learnings.join("\n")
        ));
    }
    prompt
}

pub fn extract_learnings(
    query: &str,
    contents: &[&str],
    max_learnings: usize,
    max_follow_ups: usize,
) -> String {
    let contents = contents
        .iter()
        .map(|c| format!("<content>\n{c}\n</content>"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Given the following contents from a search for the query <query>{query}</query>, generate a list of learnings from the contents. \
         Return a maximum of {max_learnings} learnings, but feel free to return fewer if the contents are clear. \
         Make sure each learning is unique and not similar to the others. \
         The learnings should be concise and to the point, as detailed and information dense as possible. \
         Include any entities like people, places, companies, products and things, as well as any exact metrics, numbers, or dates. \
         Also propose up to {max_follow_ups} follow-up questions that would push the research further. \
         The learnings will be used to research the topic further.\n\n<contents>{contents}</contents>"
    )
}

/// Query handed to the next recursion level of a branch.
pub fn follow_up_query(research_goal: &str, follow_up_questions: &[String]) -> String {
    let directions: String = follow_up_questions.iter().map(|q| format!("\n{q}")).collect();
    format!("Previous research goal: {research_goal}\nFollow-up research directions: {directions}")
        .trim()
        .to_string()
}

pub fn draft_report(query: &str, learnings: &str) -> String {
    format!(
        "Given the following prompt from the user, write a final report on the topic using the learnings from research. \
         Make it as detailed as possible, aim for 3 or more pages, and include ALL the learnings from research:\n\n\
         <prompt>{query}</prompt>\n\n\
         Here are all the learnings from previous research:\n\n<learnings>\n{learnings}\n</learnings>"
    )
}

pub fn criticize_report(query: &str, report: &str) -> String {
    format!(
        "Critically review the following research report written for the prompt <prompt>{query}</prompt>. \
         Point out gaps, unsupported claims, missing perspectives, outdated facts, and weak structure. \
         Be specific and actionable.\n\n<report>\n{report}\n</report>"
    )
}

pub fn critique_questions(criticism: &str, max_questions: usize) -> String {
    format!(
        "Given the following criticism of a research report, write up to {max_questions} research questions \
         whose answers would address it. Each question should be answerable with a web search.\n\n\
         <criticism>\n{criticism}\n</criticism>"
    )
}

/// Query handed to the orchestrator during a refinement iteration.
pub fn refinement_query(initial_query: &str, criticism: &str, questions: &[String]) -> String {
    let questions: String = questions.iter().map(|q| format!("\n- {q}")).collect();
    format!(
        "Original research prompt: {initial_query}\n\
         Criticism of the current report: {criticism}\n\
         Open questions to research:{questions}"
    )
}

pub fn revise_report(query: &str, report: &str, learnings: &str) -> String {
    format!(
        "Revise the following research report for the prompt <prompt>{query}</prompt>. \
         Integrate the new learnings, fix the weaknesses they reveal, and keep everything from the current report that is still accurate. \
         Return the complete revised report in markdown.\n\n\
         <report>\n{report}\n</report>\n\n<new_learnings>\n{learnings}\n</new_learnings>"
    )
}

pub fn suggest_file_name(query: &str) -> String {
    format!(
        "Suggest a short, descriptive file name (lowercase words separated by hyphens, no extension) \
         for a research report on: <prompt>{query}</prompt>"
    )
}

/// Wrap learnings in tags for report prompts.
pub fn learnings_block(learnings: &[String]) -> String {
    learnings
        .iter()
        .map(|l| format!("<learning>\n{l}\n</learning>"))
        .collect::<Vec<_>>()
        .join("\n")
}
