//! Knowledge Base Answering
//!
//! Retrieval-augmented question answering: fetch the nearest documents from
//! the shared knowledge base, stuff their content into a single prompt, and
//! ask the chat model for one completion.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use super::{error_text, unavailable_message};
use crate::context::{Document, KnowledgeBase};
use crate::llm::{ChatModel, ChatRequest};

/// Prompt wrapped around the retrieved context
const STUFF_PROMPT: &str = "Use the following pieces of context to answer the question at the end. \
If the context does not contain the answer, say that you don't know instead of making one up.

{context}

Question: {question}
Helpful Answer:";

/// Result of one answering pass
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Documents that were placed in the prompt
    pub sources: Vec<Document>,
}

/// Build the prompt for `question` over `docs`
pub fn build_prompt(question: &str, docs: &[Document]) -> String {
    let context = docs
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    STUFF_PROMPT
        .replace("{context}", &context)
        .replace("{question}", question)
}

/// Answers questions from the knowledge base
pub struct KnowledgeAnswerer {
    kb: Arc<KnowledgeBase>,
    llm: Arc<dyn ChatModel>,
    top_k: usize,
    db_path: PathBuf,
}

impl KnowledgeAnswerer {
    pub fn new(kb: Arc<KnowledgeBase>, llm: Arc<dyn ChatModel>, top_k: usize, db_path: PathBuf) -> Self {
        Self {
            kb,
            llm,
            top_k,
            db_path,
        }
    }

    /// Run the full pipeline, keeping the source documents.
    ///
    /// `None` means the knowledge base is unavailable.
    pub async fn answer_with_sources(&self, question: &str) -> Option<anyhow::Result<Answer>> {
        let store = self.kb.store().await?;

        Some(async {
            let start = Instant::now();
            let sources = store.similarity_search(question, self.top_k).await?;
            let prompt = build_prompt(question, &sources);
            let text = self.llm.chat(&ChatRequest::single(prompt)).await?;

            info!(
                sources = sources.len(),
                model = self.llm.chat_model(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Knowledge answer generated"
            );
            Ok::<_, anyhow::Error>(Answer { text, sources })
        }
        .await)
    }

    /// Answer `question`, returning only the answer text
    pub async fn answer(&self, question: &str) -> String {
        match self.answer_with_sources(question).await {
            None => unavailable_message(&self.db_path),
            Some(Ok(answer)) => answer.text,
            Some(Err(e)) => {
                error!(error = %e, "Knowledge answer failed");
                error_text(e)
            }
        }
    }
}
