//! Request-level services
//!
//! - **KnowledgeAnswerer**: retrieval-augmented answers from the knowledge base
//! - **KnowledgeSearch**: the nearest source passages, formatted for display
//! - **ChatService**: freeform chat over one shared conversation memory
//!
//! Every service returns plain text. Failures are rendered into that text
//! (`"Error: ..."` or the unavailability notice) rather than surfaced to the
//! HTTP layer as errors.

pub mod answering;
pub mod chat;
pub mod search;

pub use answering::{Answer, KnowledgeAnswerer};
pub use chat::{ChatService, ChatStats, ConversationMemory, Turn};
pub use search::{format_sources, KnowledgeSearch, NO_SOURCES};

use std::fmt::Display;
use std::path::Path;

/// Text returned when the knowledge store could not be opened
pub fn unavailable_message(db_path: &Path) -> String {
    format!(
        "Knowledge base not available. Please ensure the '{}' folder exists.",
        db_path.display()
    )
}

/// Render a failure the way every service reports it
pub(crate) fn error_text(err: impl Display) -> String {
    format!("Error: {err:#}")
}
