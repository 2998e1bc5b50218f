//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Server
// ============================================================================

/// Bind host for the HTTP server.
pub const SERVER_HOST: &str = "0.0.0.0";

/// HTTP port used when neither `PORT` nor the config file sets one.
pub const SERVER_PORT: u16 = 8080;

/// Title substituted into the index page.
pub const PAGE_TITLE: &str = "";

// ============================================================================
// Cohere
// ============================================================================

pub const COHERE_BASE_URL: &str = "https://api.cohere.com";

/// Embedding model the knowledge base was built with.
pub const EMBED_MODEL: &str = "embed-english-light-v2.0";

pub const CHAT_MODEL: &str = "command-r";

/// HTTP client timeout for provider requests (seconds).
pub const COHERE_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Knowledge base
// ============================================================================

/// Location of the pre-built document store, relative to the working directory.
pub const KNOWLEDGE_DB_PATH: &str = "content/db";

/// Documents retrieved per question.
pub const KNOWLEDGE_TOP_K: usize = 3;
