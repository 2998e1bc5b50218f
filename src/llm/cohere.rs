//! Cohere Client: HTTP client for the hosted embedding and chat models
//!
//! Talks to the v1 REST API:
//! - `POST /v1/embed` for query embeddings
//! - `POST /v1/chat` for completions with chat history

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ChatMessage, ChatModel, ChatRequest, ChatRole, Embedder, LlmError};
use crate::config::CohereConfig;

/// Body of `POST /v1/embed`
#[derive(Debug, Serialize)]
struct EmbedBody<'a> {
    model: &'a str,
    texts: [&'a str; 1],
    input_type: &'static str,
    truncate: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Body of `POST /v1/chat`
#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    message: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chat_history: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    message: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(msg: &'a ChatMessage) -> Self {
        let role = match msg.role {
            ChatRole::User => "USER",
            ChatRole::Chatbot => "CHATBOT",
        };
        Self {
            role,
            message: &msg.text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

/// Error payload returned with non-2xx statuses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP client for the Cohere API
#[derive(Clone)]
pub struct CohereClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    embed_model: String,
    chat_model: String,
    temperature: Option<f32>,
}

impl CohereClient {
    /// Create a client from configuration.
    ///
    /// A missing API key is not an error here; every request made without
    /// one fails with `LlmError::MissingApiKey`.
    pub fn new(config: &CohereConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            embed_model: config.embed_model.clone(),
            chat_model: config.chat_model.clone(),
            temperature: config.temperature,
        })
    }

    /// Whether requests can be authenticated
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Provider endpoint, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or(LlmError::MissingApiKey)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_key()?)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
                .map(|e| e.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).trim().to_string());
            return Err(LlmError::Api { status, message });
        }

        serde_json::from_slice(&bytes).map_err(|e| LlmError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Embedder for CohereClient {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbedBody {
            model: &self.embed_model,
            texts: [text],
            input_type: "search_query",
            truncate: "END",
        };

        let resp: EmbedResponse = self.post("/v1/embed", &body).await?;
        let embedding = resp
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Decode("embed response contained no embeddings".into()))?;

        debug!(model = %self.embed_model, dims = embedding.len(), "Embedded query");
        Ok(embedding)
    }

    fn embed_model(&self) -> &str {
        &self.embed_model
    }
}

#[async_trait]
impl ChatModel for CohereClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = ChatBody {
            message: &request.message,
            model: &self.chat_model,
            chat_history: request.history.iter().map(WireMessage::from).collect(),
            preamble: request.preamble.as_deref(),
            temperature: self.temperature,
        };

        let resp: ChatResponse = self.post("/v1/chat", &body).await?;

        debug!(
            model = %self.chat_model,
            history = request.history.len(),
            reply_chars = resp.text.len(),
            "Chat completion received"
        );
        Ok(resp.text)
    }

    fn chat_model(&self) -> &str {
        &self.chat_model
    }
}
