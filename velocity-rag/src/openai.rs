//! [`EmbeddingProvider`] for OpenAI-compatible `/embeddings` endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::http;

/// OpenAI's API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Environment variable read by [`OpenAIEmbeddingProvider::from_env`].
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Model used unless [`OpenAIEmbeddingProvider::with_model`] says otherwise.
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

const PROVIDER: &str = "OpenAI";

/// Output size of the OpenAI catalogue models.
fn catalogue_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

/// Embeds text through `{base}/embeddings`.
///
/// Any server copying OpenAI's protocol works (vLLM, Ollama, LiteLLM). For
/// models outside OpenAI's catalogue call
/// [`with_dimensions`](Self::with_dimensions); otherwise the first response
/// whose vectors are not 1536 wide is rejected.
///
/// ```rust,ignore
/// let provider = OpenAIEmbeddingProvider::from_env()?
///     .with_base_url("http://localhost:11434/v1")
///     .with_model("nomic-embed-text")
///     .with_dimensions(768);
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for [`DEFAULT_OPENAI_MODEL`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] for a blank key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(provider_error("API key must not be empty".into()));
        }
        Ok(Self {
            client: http::client().map_err(provider_error)?,
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_OPENAI_MODEL.into(),
            dimensions: None,
        })
    }

    /// Create a provider keyed from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(OPENAI_API_KEY_ENV)
            .map_err(|_| provider_error(format!("{OPENAI_API_KEY_ENV} is not set")))?;
        Self::new(api_key)
    }

    /// Point the provider at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Fix the vector width. It is also sent as the `dimensions` request
    /// field, which the `text-embedding-3-*` models use to shorten output.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

fn provider_error(message: String) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Vectors in input order; servers may answer out of order and say so via `index`.
fn into_ordered(response: EmbeddingResponse) -> Vec<Vec<f32>> {
    let mut data = response.data;
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| provider_error("API returned no embedding".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, batch_size = texts.len(), "requesting embeddings");

        let request =
            EmbeddingRequest { model: &self.model, input: texts, dimensions: self.dimensions };
        let response: EmbeddingResponse =
            http::post_json(&self.client, &self.endpoint(), &self.api_key, &request)
                .await
                .map_err(|message| {
                    error!(model = %self.model, %message, "embedding request failed");
                    provider_error(message)
                })?;

        let embeddings = into_ordered(response);
        if embeddings.len() != texts.len() {
            return Err(provider_error(format!(
                "sent {} inputs but got {} embeddings",
                texts.len(),
                embeddings.len()
            )));
        }
        let expected = self.dimensions();
        if let Some(width) = embeddings.iter().map(Vec::len).find(|&w| w != expected) {
            return Err(provider_error(format!(
                "model '{}' returned {width}-dimensional vectors, expected {expected}; \
                 configure the dimensions explicitly",
                self.model
            )));
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions.or_else(|| catalogue_dimensions(&self.model)).unwrap_or(1536)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_is_rejected() {
        assert!(matches!(
            OpenAIEmbeddingProvider::new(" "),
            Err(RagError::EmbeddingError { .. })
        ));
    }

    #[test]
    fn dimensions_follow_the_model_unless_overridden() {
        let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap();
        assert_eq!(provider.dimensions(), 1536);

        let large = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_model("text-embedding-3-large");
        assert_eq!(large.dimensions(), 3072);

        let local = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:11434/v1/")
            .with_model("nomic-embed-text")
            .with_dimensions(768);
        assert_eq!(local.dimensions(), 768);
        assert_eq!(local.model_id(), "nomic-embed-text");
        assert_eq!(local.endpoint(), "http://localhost:11434/v1/embeddings");
    }

    #[test]
    fn response_is_reordered_by_index() {
        let body = r#"{"data":[{"index":1,"embedding":[0.5]},{"index":0,"embedding":[0.25]}]}"#;
        let response: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(into_ordered(response), vec![vec![0.25], vec![0.5]]);
    }

    #[test]
    fn dimensions_are_only_requested_when_set() {
        let input = ["battlecard"];
        let request = EmbeddingRequest { model: "m", input: &input, dimensions: None };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("dimensions").is_none());
        assert_eq!(json["input"][0], "battlecard");
    }
}
