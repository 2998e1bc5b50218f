//! Knowledge base source search
//!
//! Returns the passages nearest to a query as a numbered, human-readable
//! block:
//!
//! ```text
//! Source 1
//! <content>
//!
//! Source 2
//! <content>
//!
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use super::{error_text, unavailable_message};
use crate::context::{Document, KnowledgeBase};

/// Text returned when the search matched nothing
pub const NO_SOURCES: &str = "No sources found.";

/// Render documents as numbered source blocks, or `NO_SOURCES` when empty
pub fn format_sources(docs: &[Document]) -> String {
    if docs.is_empty() {
        return NO_SOURCES.to_string();
    }

    let mut out = String::new();
    for (n, doc) in docs.iter().enumerate() {
        out.push_str(&format!("Source {}\n{}\n\n", n + 1, doc.content));
    }
    out
}

/// Source search over the shared knowledge base
pub struct KnowledgeSearch {
    kb: Arc<KnowledgeBase>,
    top_k: usize,
    db_path: PathBuf,
}

impl KnowledgeSearch {
    pub fn new(kb: Arc<KnowledgeBase>, top_k: usize, db_path: PathBuf) -> Self {
        Self { kb, top_k, db_path }
    }

    /// Nearest documents for `query`
    pub async fn sources(&self, query: &str) -> Option<anyhow::Result<Vec<Document>>> {
        let store = self.kb.store().await?;
        Some(store.similarity_search(query, self.top_k).await)
    }

    /// Search and format, never failing
    pub async fn search(&self, query: &str) -> String {
        match self.sources(query).await {
            None => unavailable_message(&self.db_path),
            Some(Ok(docs)) => {
                info!(matches = docs.len(), "Knowledge search complete");
                format_sources(&docs)
            }
            Some(Err(e)) => {
                error!(error = %e, "Knowledge search failed");
                error_text(e)
            }
        }
    }
}
