//! Hosted chat-model clients.
//!
//! [`GroqChatModel`] speaks the OpenAI-compatible chat-completions protocol
//! that Groq exposes, so it also works against any other server implementing
//! `POST {base}/chat/completions`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::http;

/// Environment variable holding the Groq credential.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Groq's OpenAI-compatible API base.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// The model answers are generated with by default.
pub const DEFAULT_CHAT_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";

/// A language model that turns a finished prompt into text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model identifier, for logs.
    fn name(&self) -> &str;

    /// Send `prompt` as a single user message and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// A [`ChatModel`] backed by Groq (or any OpenAI-compatible endpoint).
///
/// Requests are sent with `temperature = 0` so answers are as repeatable as
/// the provider allows.
///
/// # Example
///
/// ```rust,ignore
/// use velocity_rag::GroqChatModel;
///
/// let model = GroqChatModel::new(std::env::var("GROQ_API_KEY")?)?;
/// let answer = model.complete("Say hi").await?;
/// ```
pub struct GroqChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GroqChatModel {
    /// Create a client for the default model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LlmError`] if the key is empty or the HTTP client
    /// cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::LlmError {
                model: DEFAULT_CHAT_MODEL.into(),
                message: "API key must not be empty".into(),
            });
        }

        let client = http::client()
            .map_err(|message| RagError::LlmError { model: DEFAULT_CHAT_MODEL.into(), message })?;

        Ok(Self {
            client,
            api_key,
            base_url: GROQ_API_BASE.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: 0.0,
        })
    }

    /// Create a client using the `GROQ_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(GROQ_API_KEY_ENV).map_err(|_| RagError::LlmError {
            model: DEFAULT_CHAT_MODEL.into(),
            message: format!("{GROQ_API_KEY_ENV} environment variable not set"),
        })?;
        Self::new(api_key)
    }

    /// Use another model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn llm_error(&self, message: String) -> RagError {
        RagError::LlmError { model: self.model.clone(), message }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

fn first_reply(response: ChatResponse) -> Option<String> {
    response.choices.into_iter().next().and_then(|c| c.message.content)
}

#[async_trait]
impl ChatModel for GroqChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "sending chat completion");

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        let parsed: ChatResponse =
            http::post_json(&self.client, &self.endpoint(), &self.api_key, &body)
                .await
                .map_err(|message| {
                    error!(model = %self.model, %message, "chat completion failed");
                    self.llm_error(message)
                })?;

        first_reply(parsed).ok_or_else(|| self.llm_error("response contained no message".into()))
    }
}
