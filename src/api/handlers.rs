//! API route handlers
//!
//! Request handling logic for all endpoints:
//! - Knowledge base answers (`/kbanswer`)
//! - Knowledge base source search (`/search`)
//! - Freeform chat (`/answer`)
//! - Service health (`/health`)
//!
//! Service failures are already rendered into the reply text, so every
//! handler answers 200 once the body has been parsed.

use anyhow::Context;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::AppConfig;
use crate::context::{CohereStoreLoader, KnowledgeBase};
use crate::llm::{ChatModel, CohereClient};
use crate::services::{ChatService, KnowledgeAnswerer, KnowledgeSearch};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub answerer: Arc<KnowledgeAnswerer>,
    pub search: Arc<KnowledgeSearch>,
    pub chat: Arc<ChatService>,
    /// Shared knowledge base, for health reporting
    pub knowledge: Arc<KnowledgeBase>,
    /// Title rendered into the index page
    pub page_title: String,
    /// Optional cap on request bodies
    pub body_limit_bytes: Option<usize>,
}

impl ApiState {
    /// Wire the services around a chat model and knowledge base
    pub fn new(config: &AppConfig, llm: Arc<dyn ChatModel>, knowledge: Arc<KnowledgeBase>) -> Self {
        let db_path = config.knowledge.db_path.clone();
        let top_k = config.knowledge.top_k;

        Self {
            answerer: Arc::new(KnowledgeAnswerer::new(
                Arc::clone(&knowledge),
                Arc::clone(&llm),
                top_k,
                db_path.clone(),
            )),
            search: Arc::new(KnowledgeSearch::new(Arc::clone(&knowledge), top_k, db_path)),
            chat: Arc::new(ChatService::new(llm)),
            knowledge,
            page_title: config.server.page_title.clone(),
            body_limit_bytes: config.server.body_limit_bytes,
        }
    }

    /// Build the production state: Cohere for chat and embeddings, the
    /// on-disk store opened lazily on first use.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let llm = CohereClient::new(&config.cohere).context("failed to build Cohere client")?;
        let loader = CohereStoreLoader::new(&config.cohere, &config.knowledge);
        let knowledge = Arc::new(KnowledgeBase::new(Arc::new(loader)));
        Ok(Self::new(config, Arc::new(llm), knowledge))
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body accepted by every POST endpoint
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// Body returned by every POST endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn json(message: String) -> Json<Self> {
        Json(Self { message })
    }
}

/// Service health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub knowledge_base: String,
    pub conversation_turns: usize,
    pub last_turn_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /kbanswer - answer from the knowledge base
pub async fn kb_answer(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> Json<MessageResponse> {
    debug!(chars = req.message.len(), "kbanswer request");
    MessageResponse::json(state.answerer.answer(&req.message).await)
}

/// POST /search - nearest knowledge base sources
pub async fn search(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> Json<MessageResponse> {
    debug!(chars = req.message.len(), "search request");
    MessageResponse::json(state.search.search(&req.message).await)
}

/// POST /answer - next reply in the shared conversation
pub async fn chat_answer(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> Json<MessageResponse> {
    debug!(chars = req.message.len(), "answer request");
    MessageResponse::json(state.chat.reply(&req.message).await)
}

/// GET /health - knowledge base state and memory size
///
/// Never waits on the knowledge base load or an in-flight chat reply.
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let chat = state.chat.stats();
    Json(HealthResponse {
        status: "ok",
        knowledge_base: state.knowledge.state().to_string(),
        conversation_turns: chat.turns,
        last_turn_at: chat.last_turn_at,
    })
}
