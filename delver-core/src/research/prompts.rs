//! Prompt builders for every request the pipeline makes.
//!
//! Each builder states the single accepted output grammar for its request
//! type; `research::parse` validates against exactly that grammar. Inputs
//! are embedded as JSON so section titles and learnings with quotes or
//! newlines cannot break the prompt structure.

use serde_json::json;

use crate::types::ClarifyingAnswer;

/// System prompt sent with every completion request.
pub const SYSTEM_PROMPT: &str = "You are a research assistant. Follow the output format \
     in each request exactly: when a JSON array is requested, return only the JSON array \
     with no surrounding text, markdown, or commentary.";

/// How many clarifying questions a topic gets before research starts.
pub const CLARIFYING_QUESTION_COUNT: usize = 3;

pub fn clarifying_questions(topic: &str) -> String {
    format!(
        "<prompt>You are a follow-up question generator. A user will provide a research \
         topic. Produce exactly {CLARIFYING_QUESTION_COUNT} concise questions (under 15 words \
         each) that clarify the user's research goals, motivations, or desired knowledge about \
         that topic. Ask about the user's intentions, never quiz their knowledge. Return only \
         a JSON array of {CLARIFYING_QUESTION_COUNT} strings.</prompt>\n\n\
         <input>{input}</input>\n\n\
         <example_output>[\"What specific insights do you hope to gain about solar energy?\", \
         \"Is there a practical outcome you want from this research?\", \
         \"Why is this topic important for your project?\"]</example_output>",
        input = json!({ "topic": topic })
    )
}

pub fn sections(topic: &str, answers: &[ClarifyingAnswer], breadth: usize) -> String {
    format!(
        "<prompt>You are a section planner for a research report. You will receive a primary \
         topic and the user's clarifying question-answer pairs. Weight the plan roughly 65% \
         toward the main topic and 35% toward the user's stated interests. Produce an ordered \
         plan of between {min} and {max} sections that together cover the subject. Do not \
         include sections named \"Introduction\", \"Conclusion\", or \"Sources\"; those are \
         produced separately. Each section label must be concise but descriptive. Return only \
         a JSON array of section label strings.</prompt>\n\n\
         <input>{input}</input>\n\n\
         <example_output>[\"Key Principles and Terminology\", \"Practical Applications\", \
         \"Current Limitations\", \"Future Outlook\"]</example_output>",
        min = breadth,
        max = breadth + 2,
        input = json!({ "topic": topic, "feedback": answers })
    )
}

pub fn title(topic: &str, sections: &[String]) -> String {
    format!(
        "<prompt>You are a title generator for a research report. You will receive the topic \
         and the planned sections. Produce exactly one title of at most 12 words that captures \
         the report's overall focus. Return only the title as plain text with no quotes or \
         extra formatting.</prompt>\n\n\
         <input>{input}</input>",
        input = json!({ "topic": topic, "sections": sections })
    )
}

pub fn introduction(topic: &str, sections: &[String]) -> String {
    format!(
        "<prompt>You are an introduction writer for a research report. You will receive the \
         topic and the planned sections. Write one introduction of at most 250 words that \
         summarizes the topic, explains why it matters, and previews the sections in order. \
         Return only the introduction as plain text.</prompt>\n\n\
         <input>{input}</input>",
        input = json!({ "topic": topic, "sections": sections })
    )
}

pub fn queries(topic: &str, section: &str, breadth: usize) -> String {
    format!(
        "<prompt>You are a search query generator for a research report. You will receive a \
         topic, one section of that topic, and a query count. Produce exactly {breadth} web \
         search queries that will surface useful references for the section. Each query must \
         be concise, specific, and clearly tied to the section. Return only a JSON array of \
         {breadth} query strings.</prompt>\n\n\
         <input>{input}</input>\n\n\
         <example_output>[\"introduction to quantum computing principles\", \
         \"qubit superposition explained\"]</example_output>",
        input = json!({ "topic": topic, "section": section, "breadth": breadth })
    )
}

pub fn gap_queries(topic: &str, section: &str, gaps: &[String], breadth: usize) -> String {
    format!(
        "<prompt>You are a search query generator for a research report. The listed knowledge \
         gaps remain after an initial research pass over one section. Produce up to {breadth} \
         web search queries aimed specifically at closing those gaps. Return only a JSON array \
         of query strings.</prompt>\n\n\
         <input>{input}</input>",
        input = json!({ "topic": topic, "section": section, "gaps": gaps, "breadth": breadth })
    )
}

pub fn learnings(section: &str, url: &str, text: &str) -> String {
    format!(
        "<prompt>You are a learning extractor for a research report. You will receive a \
         section title, a source URL, and an excerpt of text from that source. Extract the \
         facts from the excerpt that are relevant to the section, each as one self-contained \
         learning of at most 50 words that cites the URL in the form [source: URL]. Grade \
         each learning's relevance to the section from 0.0 to 1.0. Return only a JSON array \
         of objects of the form {{\"learning\": string, \"grade\": number}}. Return an empty \
         JSON array if the excerpt contains nothing relevant.</prompt>\n\n\
         <input>{input}</input>\n\n\
         <example_output>[{{\"learning\": \"Qubits can hold multiple states at once \
         [source: https://example.com/quantum]\", \"grade\": 0.9}}]</example_output>",
        input = json!({ "section": section, "url": url, "text": text })
    )
}

pub fn gaps(topic: &str, section: &str, learnings: &[String], max_gaps: usize) -> String {
    format!(
        "<prompt>You are a gap analyst for a research report. You will receive a topic, one \
         section, and the learnings gathered for that section so far. Name up to {max_gaps} \
         specific knowledge gaps that further web research could close for this section. If \
         the learnings already cover the section adequately, return an empty JSON array. \
         Return only a JSON array of gap description strings.</prompt>\n\n\
         <input>{input}</input>",
        input = json!({ "topic": topic, "section": section, "learnings": learnings })
    )
}

pub fn synthesis(topic: &str, section: &str, learnings: &[String]) -> String {
    format!(
        "<prompt>You are a section writer for a research report. You will receive a topic, \
         one section title, and the learnings gathered for that section. Write the section's \
         prose from those learnings, keeping their source citations in the form \
         [source: URL] where they appear. Do not invent facts beyond the learnings. Return \
         only the section text as plain text without repeating the section title.</prompt>\n\n\
         <input>{input}</input>",
        input = json!({ "topic": topic, "section": section, "learnings": learnings })
    )
}

pub fn conclusion(topic: &str, title: &str, learnings: &[String]) -> String {
    format!(
        "<prompt>You are a conclusion writer for a research report. You will receive the \
         report's topic, its title, and every learning gathered across all sections. Write a \
         closing synthesis that draws the threads together and states the main takeaways. \
         Return only the conclusion as plain text.</prompt>\n\n\
         <input>{input}</input>",
        input = json!({ "topic": topic, "title": title, "learnings": learnings })
    )
}
