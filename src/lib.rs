//! Ziggy: knowledge-base assistant service
//!
//! HTTP front-end over a hosted language model and a local document store.
//!
//! ## Architecture
//!
//! - **LLM Module**: Cohere client for query embeddings and chat completions
//! - **Context Module**: on-disk vector store, opened lazily and shared
//! - **Services**: knowledge base answering, source search, shared-memory chat
//! - **API**: Axum routes and the embedded chat page

pub mod api;
pub mod config;
pub mod context;
pub mod llm;
pub mod services;

// Re-export configuration
pub use config::AppConfig;

// Re-export the API entry points
pub use api::{create_app, ApiState};

// Re-export knowledge base components
pub use context::{Document, KnowledgeBase, KnowledgeState, KnowledgeStore, VectorDb};

// Re-export LLM components
pub use llm::{ChatMessage, ChatModel, ChatRequest, ChatRole, CohereClient, Embedder, LlmError};

// Re-export services
pub use services::{ChatService, KnowledgeAnswerer, KnowledgeSearch};
