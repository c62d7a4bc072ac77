//! Prompt assembly

use crate::persona::{Language, Persona};

/// Keeps the model on topic; present verbatim in every prompt
pub const SCOPE_RESTRICTION: &str = "Strictly DO NOT ANSWER ANY OTHER QUESTIONS OTHER THAN RELATED TO \
GROUNDWATER AND MAKE SURE TO RETURN THE RESPONSE AS THE FOLLOWING MESSAGE IN CASE ANY REQUEST IS SENT \
THAT IS OUT OF SCOPE OF CONTEXTUAL DATA, OR INDIAN GROUNDWATER/RAINFALL DATA IN GENERAL:";

/// Returned in structured mode when the model output is not the expected JSON
pub const STRUCTURED_ERROR_HTML: &str =
  "<div>Sorry, an error occurred while processing the AI response.</div>";

const HTML_FORMATTING: &str = "Keep it in proper formatted HTML content only, and accurately. \
Please make sure that new paragraphs and new sentences start at a new line to ensure formatting is clean. \
If data spans over 15 rows, format as 'Key: value' lines instead of a table.";

const STRUCTURED_FORMAT: &str = r#"You MUST ALWAYS return a single, valid JSON object.

The JSON object must have this exact structure:
{
  "html_answer": "<Your HTML response here>",
  "chart_data": {
    "type": "bar",
    "data": {
      "labels": ["Label 1", "Label 2"],
      "datasets": [{ "label": "Dataset Label", "data": [10, 20] }]
    }
  } OR null
}

--- VERY IMPORTANT RULES ---
1. The "html_answer" value MUST be a single-line JSON string. Use "<br>" for line breaks.
2. If the 'Context' is empty or irrelevant, return this JSON:
   { "html_answer": "<div>I'm sorry, I could not find any data for that specific query.</div>", "chart_data": null }
3. If the query is out of scope, put the refusal message above in "html_answer" and set "chart_data" to null.
--- END OF IMPORTANT RULES ---

INSTRUCTIONS FOR 'html_answer' (Only if context is NOT empty):
1. Adhere to your persona's style.
2. Format in clean HTML. For each distinct entry, wrap it in a `<div>` and use `<br>` between key-value pairs.

INSTRUCTIONS FOR 'chart_data' (Only if context is NOT empty):
1. Analyze the context for comparable numerical data.
2. If such data exists, generate a chart object.
3. If the context is a large data dump (>15 entries), return `null`."#;

/// Requested shape of the model's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerFormat {
  /// Free-text HTML
  #[default]
  Html,
  /// JSON with `html_answer` and `chart_data`
  Structured,
}

impl AnswerFormat {
  /// `structured`/`json` select structured output; anything else is HTML
  pub fn parse(value: &str) -> Self {
    match value.trim().to_ascii_lowercase().as_str() {
      "structured" | "json" => AnswerFormat::Structured,
      _ => AnswerFormat::Html,
    }
  }
}

fn preamble(persona: &Persona, language: Language) -> String {
  format!(
    "You are acting as: {persona}. {SCOPE_RESTRICTION} '{apology}' \
     Answer the following query in {name} with language code {code}. ",
    apology = language.apology(),
    name = language.name(),
    code = language.code(),
  )
}

/// Prompt asking for a free-text HTML answer
pub fn html_prompt(query: &str, context: &str, persona: &Persona, language: Language) -> String {
  format!(
    "{}{HTML_FORMATTING} {} \n\nQuery: {query}\n\nContext:\n{context}",
    preamble(persona, language),
    persona.style()
  )
}

/// Prompt asking for the structured JSON answer
pub fn structured_prompt(query: &str, context: &str, persona: &Persona, language: Language) -> String {
  format!(
    "{}Persona style: {}\n\n{STRUCTURED_FORMAT}\n\nQuery: {query}\n\nContext:\n{context}",
    preamble(persona, language),
    persona.style()
  )
}

pub fn build_prompt(
  format: AnswerFormat,
  query: &str,
  context: &str,
  persona: &Persona,
  language: Language,
) -> String {
  match format {
    AnswerFormat::Html => html_prompt(query, context, persona, language),
    AnswerFormat::Structured => structured_prompt(query, context, persona, language),
  }
}
