//! LLM Provider Module
//!
//! Provides the two capabilities the services consume from the hosted model
//! provider:
//!
//! - **Embedder**: turns a query into a vector for knowledge base lookup
//! - **ChatModel**: produces a completion for a message plus prior turns
//!
//! `CohereClient` implements both over the Cohere REST API. Services only see
//! the traits, so tests swap in deterministic doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod cohere;

pub use cohere::CohereClient;

/// Provider errors
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("COHERE_API_KEY is not set")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("unexpected provider response: {0}")]
    Decode(String),
}

/// Speaker of a message in a chat history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Chatbot,
}

/// One message of a chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn chatbot(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Chatbot,
            text: text.into(),
        }
    }
}

/// A single completion request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    /// System-style instructions placed ahead of the conversation
    pub preamble: Option<String>,
    /// Prior turns, oldest first
    pub history: Vec<ChatMessage>,
    /// The new user message
    pub message: String,
}

impl ChatRequest {
    /// A request with no preamble and no history
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Text embedding capability
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Model identifier for logging
    fn embed_model(&self) -> &str;
}

/// Generative chat capability
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate the reply to `request.message` given the preamble and history
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Model identifier for logging
    fn chat_model(&self) -> &str;
}
