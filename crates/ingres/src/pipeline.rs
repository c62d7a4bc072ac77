//! Query pipeline
//!
//! translate (optional) → embed → search → concatenate context → prompt →
//! generate → parse or translate the answer. Every external failure
//! degrades to a fixed per-language answer instead of an error.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::embeddings::EmbeddingProvider;
use crate::generation::GenerationProvider;
use crate::persona::{Language, Persona};
use crate::prompt::{build_prompt, AnswerFormat, STRUCTURED_ERROR_HTML};
use crate::states::CollectionLayout;
use crate::translation::Translator;
use crate::vector_store::VectorStore;

pub const DEFAULT_N_RESULTS: usize = 60;

/// A user question with its styling
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
  pub text: String,
  pub persona: Persona,
  pub language: Language,
}

impl Query {
  pub fn new(text: impl Into<String>, persona: Persona, language: Language) -> Self {
    Self { text: text.into(), persona, language }
  }
}

/// Answer object for structured responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
  pub html_answer: String,
  #[serde(default)]
  pub chart_data: Option<serde_json::Value>,
}

/// What the pipeline hands back to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
  Html(String),
  Structured(StructuredAnswer),
}

impl Answer {
  /// The language's fixed refusal in the requested shape
  pub fn apology(language: Language, format: AnswerFormat) -> Self {
    match format {
      AnswerFormat::Html => Answer::Html(language.apology().to_string()),
      AnswerFormat::Structured => {
        Answer::Structured(StructuredAnswer { html_answer: language.apology().to_string(), chart_data: None })
      }
    }
  }

  /// HTML body regardless of shape
  pub fn html(&self) -> &str {
    match self {
      Answer::Html(html) => html,
      Answer::Structured(structured) => &structured.html_answer,
    }
  }
}

/// Parse a structured model reply, tolerating a ```json fence
pub fn parse_structured(raw: &str) -> Answer {
  let trimmed = raw.trim();
  let unfenced = trimmed.strip_prefix("```json").unwrap_or(trimmed);
  let unfenced = unfenced.strip_suffix("```").unwrap_or(unfenced).trim();

  match serde_json::from_str::<StructuredAnswer>(unfenced) {
    Ok(parsed) => {
      info!("Parsed structured response from model");
      Answer::Structured(parsed)
    }
    Err(e) => {
      error!("Error processing model response: {e}");
      error!("Raw model response was: {raw}");
      Answer::Structured(StructuredAnswer { html_answer: STRUCTURED_ERROR_HTML.to_string(), chart_data: None })
    }
  }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
  pub layout: CollectionLayout,
  pub n_results: usize,
}

pub struct QueryPipeline {
  embedder: Arc<dyn EmbeddingProvider>,
  store: Arc<dyn VectorStore>,
  generator: Arc<dyn GenerationProvider>,
  translator: Option<Arc<dyn Translator>>,
  options: PipelineOptions,
}

impl QueryPipeline {
  pub fn new(
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerationProvider>,
    options: PipelineOptions,
  ) -> Self {
    Self { embedder, store, generator, translator: None, options }
  }

  pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
    self.translator = Some(translator);
    self
  }

  /// Answer a query; never fails
  pub async fn answer(&self, query: &Query, format: AnswerFormat) -> Answer {
    info!("Received query: {} | Persona: {} | Language: {}", query.text, query.persona, query.language);

    let working_text = self.to_english(&query.text).await;

    let context = match self.retrieve(&working_text).await {
      Ok(context) => context,
      Err(e) => {
        error!("Retrieval failed: {e:#}");
        return Answer::apology(query.language, format);
      }
    };
    info!("Aggregated context length: {} characters", context.len());

    let prompt = build_prompt(format, &query.text, &context, &query.persona, query.language);
    let raw = match self.generator.generate(&prompt).await {
      Ok(raw) => raw,
      Err(e) => {
        error!("Error generating response: {e:#}");
        return Answer::apology(query.language, format);
      }
    };

    match format {
      AnswerFormat::Structured => parse_structured(&raw),
      AnswerFormat::Html => Answer::Html(self.localize(raw, query.language).await),
    }
  }

  /// Embed `text` and join the nearest documents in rank order
  pub async fn retrieve(&self, text: &str) -> Result<String> {
    let embedding = self.embedder.embed(text).await?;
    info!("Query embedded successfully");

    let collections = self.options.layout.collections_for_query(text);
    let tolerate_missing = matches!(self.options.layout, CollectionLayout::PerState { .. });

    let mut documents = Vec::new();
    for collection in collections {
      match self.store.query(&collection, &embedding, self.options.n_results).await {
        Ok(matches) => {
          if !matches.is_empty() {
            info!("Retrieved {} docs from {collection}", matches.len());
          }
          documents.extend(matches.into_iter().map(|m| m.document));
        }
        Err(e) if tolerate_missing => warn!("Collection {collection} not found or error: {e:#}"),
        Err(e) => return Err(e),
      }
    }

    Ok(documents.join("\n"))
  }

  async fn to_english(&self, text: &str) -> String {
    let Some(translator) = &self.translator else {
      return text.to_string();
    };
    match translator.translate(text, Language::English.code()).await {
      Ok(translated) => {
        info!("Translated query: {translated}");
        translated
      }
      Err(e) => {
        warn!("Translation failed, using original text. Error: {e:#}");
        text.to_string()
      }
    }
  }

  async fn localize(&self, answer: String, language: Language) -> String {
    if language.is_english() {
      return answer;
    }
    let Some(translator) = &self.translator else {
      return answer;
    };
    match translator.translate(&answer, language.code()).await {
      Ok(translated) => format!("<div>{translated}</div>"),
      Err(e) => {
        warn!("Translation to {language} failed: {e:#}");
        answer
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embeddings::MockEmbeddingProvider;
  use crate::generation::MockGenerationProvider;
  use crate::prompt::SCOPE_RESTRICTION;
  use crate::states::LayoutKind;
  use crate::translation::MockTranslator;
  use crate::vector_store::{MockVectorStore, QueryMatch};
  use mockall::predicate::*;

  fn hit(document: &str) -> QueryMatch {
    QueryMatch { id: document.to_string(), document: document.to_string(), distance: Some(0.1) }
  }

  fn embedder() -> MockEmbeddingProvider {
    let mut embedder = MockEmbeddingProvider::new();
    embedder.expect_embed().returning(|_| Ok(vec![1.0, 0.0]));
    embedder
  }

  fn shared() -> PipelineOptions {
    PipelineOptions {
      layout: CollectionLayout::new(LayoutKind::Shared, "ingres_groundwater", "ingres_"),
      n_results: DEFAULT_N_RESULTS,
    }
  }

  fn pipeline(store: MockVectorStore, generator: MockGenerationProvider) -> QueryPipeline {
    QueryPipeline::new(Arc::new(embedder()), Arc::new(store), Arc::new(generator), shared())
  }

  #[tokio::test]
  async fn test_context_is_joined_in_rank_order() {
    let mut store = MockVectorStore::new();
    store
      .expect_query()
      .with(eq("ingres_groundwater"), always(), eq(60))
      .returning(|_, _, _| Ok(vec![hit("first"), hit("second")]));

    let mut generator = MockGenerationProvider::new();
    generator
      .expect_generate()
      .withf(|prompt: &str| prompt.contains(SCOPE_RESTRICTION) && prompt.ends_with("Context:\nfirst\nsecond"))
      .returning(|_| Ok("<p>answer</p>".to_string()));

    let answer = pipeline(store, generator)
      .answer(&Query::new("rainfall in Goa", Persona::default(), Language::English), AnswerFormat::Html)
      .await;
    assert_eq!(answer, Answer::Html("<p>answer</p>".to_string()));
  }

  #[tokio::test]
  async fn test_generation_failure_returns_apology() {
    let mut store = MockVectorStore::new();
    store.expect_query().returning(|_, _, _| Ok(vec![]));
    let mut generator = MockGenerationProvider::new();
    generator.expect_generate().returning(|_| Err(anyhow::anyhow!("quota exceeded")));

    let pipeline = pipeline(store, generator);
    let query = Query::new("q", Persona::default(), Language::Tamil);

    let html = pipeline.answer(&query, AnswerFormat::Html).await;
    assert_eq!(html, Answer::Html(Language::Tamil.apology().to_string()));

    let structured = pipeline.answer(&query, AnswerFormat::Structured).await;
    assert_eq!(structured.html(), Language::Tamil.apology());
  }

  #[tokio::test]
  async fn test_search_failure_returns_apology() {
    let mut store = MockVectorStore::new();
    store.expect_query().returning(|_, _, _| Err(anyhow::anyhow!("unreachable")));
    let mut generator = MockGenerationProvider::new();
    generator.expect_generate().never();

    let answer = pipeline(store, generator)
      .answer(&Query::new("q", Persona::default(), Language::English), AnswerFormat::Html)
      .await;
    assert_eq!(answer.html(), Language::English.apology());
  }

  #[tokio::test]
  async fn test_non_english_answer_is_translated_and_wrapped() {
    let mut store = MockVectorStore::new();
    store.expect_query().returning(|_, _, _| Ok(vec![hit("row")]));
    let mut generator = MockGenerationProvider::new();
    generator.expect_generate().returning(|_| Ok("answer".to_string()));
    let mut translator = MockTranslator::new();
    translator.expect_translate().with(eq("पानी"), eq("en")).returning(|_, _| Ok("water".to_string()));
    translator.expect_translate().with(eq("answer"), eq("hi")).returning(|_, _| Ok("उत्तर".to_string()));

    let answer = pipeline(store, generator)
      .with_translator(Arc::new(translator))
      .answer(&Query::new("पानी", Persona::default(), Language::Hindi), AnswerFormat::Html)
      .await;
    assert_eq!(answer, Answer::Html("<div>उत्तर</div>".to_string()));
  }

  #[tokio::test]
  async fn test_answer_translation_failure_keeps_original() {
    let mut store = MockVectorStore::new();
    store.expect_query().returning(|_, _, _| Ok(vec![]));
    let mut generator = MockGenerationProvider::new();
    generator.expect_generate().returning(|_| Ok("answer".to_string()));
    let mut translator = MockTranslator::new();
    translator.expect_translate().returning(|_, _| Err(anyhow::anyhow!("offline")));

    let answer = pipeline(store, generator)
      .with_translator(Arc::new(translator))
      .answer(&Query::new("q", Persona::default(), Language::Bengali), AnswerFormat::Html)
      .await;
    assert_eq!(answer, Answer::Html("answer".to_string()));
  }

  #[tokio::test]
  async fn test_per_state_layout_skips_failing_collections() {
    let mut store = MockVectorStore::new();
    store.expect_query().with(eq("ingres_GOA"), always(), always()).returning(|_, _, _| Ok(vec![hit("goa row")]));
    store
      .expect_query()
      .with(eq("ingres_KERALA"), always(), always())
      .returning(|_, _, _| Err(anyhow::anyhow!("missing")));

    let options = PipelineOptions {
      layout: CollectionLayout::new(LayoutKind::PerState, "", "ingres_"),
      n_results: 5,
    };
    let pipeline =
      QueryPipeline::new(Arc::new(embedder()), Arc::new(store), Arc::new(MockGenerationProvider::new()), options);

    let context = pipeline.retrieve("Goa versus Kerala").await.unwrap();
    assert_eq!(context, "goa row");
  }

  #[test]
  fn test_structured_parsing() {
    let fenced = "```json\n{\"html_answer\": \"<div>ok</div>\", \"chart_data\": null}\n```";
    assert_eq!(parse_structured(fenced).html(), "<div>ok</div>");

    let broken = parse_structured("Sure! Here is your answer.");
    assert_eq!(
      broken,
      Answer::Structured(StructuredAnswer { html_answer: STRUCTURED_ERROR_HTML.to_string(), chart_data: None })
    );
  }
}
