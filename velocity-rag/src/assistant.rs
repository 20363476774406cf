//! Question answering over a [`RagPipeline`].
//!
//! [`SalesAssistant`] runs the query half of the system: retrieve the
//! nearest chunks, render them into the [`PromptTemplate`], and hand the
//! prompt to a [`ChatModel`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::document::SearchResult;
use crate::error::Result;
use crate::llm::ChatModel;
use crate::pipeline::RagPipeline;
use crate::prompt::{PromptTemplate, format_context};

/// Label printed for chunks that carry no `source` metadata.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// A generated answer and the material it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The model's reply.
    pub text: String,
    /// Distinct source filenames of the retrieved chunks, most relevant first.
    pub sources: Vec<String>,
    /// The retrieved chunks, as returned by the pipeline.
    pub results: Vec<SearchResult>,
}

/// Distinct `source` values in retrieval order.
pub fn distinct_sources(results: &[SearchResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        let source = result.chunk.source().unwrap_or(UNKNOWN_SOURCE);
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }
    sources
}

/// Answers questions from a knowledge-base collection.
pub struct SalesAssistant {
    pipeline: Arc<RagPipeline>,
    model: Arc<dyn ChatModel>,
    template: PromptTemplate,
}

impl SalesAssistant {
    /// Pair a pipeline with a chat model, using the sales-engineer prompt.
    pub fn new(pipeline: Arc<RagPipeline>, model: Arc<dyn ChatModel>) -> Self {
        Self { pipeline, model, template: PromptTemplate::sales_engineer() }
    }

    /// Replace the prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Retrieve context for `question` from `collection` and ask the model.
    ///
    /// The retrieval step runs once; the same results feed both the prompt
    /// and [`Answer::sources`].
    pub async fn ask(&self, collection: &str, question: &str) -> Result<Answer> {
        let results = self.pipeline.query(collection, question).await?;
        let prompt = self.template.render(&format_context(&results), question);

        let text = self.model.complete(&prompt).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "answer generation failed");
            e
        })?;

        let sources = distinct_sources(&results);
        info!(model = self.model.name(), source_count = sources.len(), "answered question");
        Ok(Answer { text, sources, results })
    }
}
