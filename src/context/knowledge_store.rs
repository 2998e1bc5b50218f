//! Knowledge Store trait and the lazily opened knowledge base
//!
//! - `KnowledgeStore`: query interface the services consume
//! - `EmbeddedStore`: embeds the query with the provider, then searches the
//!   on-disk `VectorDb`
//! - `StoreLoader`: builds a store on first use
//! - `KnowledgeBase`: caches the outcome of that first load for the life of
//!   the process, successful or not

use anyhow::Context;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::vector_db::{Document, VectorDb};
use crate::config::{CohereConfig, KnowledgeConfig};
use crate::llm::{CohereClient, Embedder, LlmError};

/// Trait for knowledge store backends
///
/// Implementations are shared across request tasks, so they must be
/// `Send + Sync`.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Return up to `k` documents most similar to `query`, closest first
    async fn similarity_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Document>>;

    /// Get the store name for logging and health checks
    fn store_name(&self) -> &'static str;
}

/// Knowledge store backed by provider embeddings and a local `VectorDb`
pub struct EmbeddedStore {
    embedder: Arc<dyn Embedder>,
    db: VectorDb,
}

impl EmbeddedStore {
    pub fn new(embedder: Arc<dyn Embedder>, db: VectorDb) -> Self {
        Self { embedder, db }
    }

    /// Number of documents in the underlying store
    pub fn document_count(&self) -> usize {
        self.db.len()
    }
}

#[async_trait]
impl KnowledgeStore for EmbeddedStore {
    async fn similarity_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Document>> {
        let embedding = self.embedder.embed_query(query).await?;
        let db = self.db.clone();
        // sled reads are blocking; keep them off the async workers.
        let docs = tokio::task::spawn_blocking(move || db.similarity_search(&embedding, k))
            .await
            .context("similarity search task failed")??;
        Ok(docs)
    }

    fn store_name(&self) -> &'static str {
        "EmbeddedStore"
    }
}

/// Builds a knowledge store on first use
#[async_trait]
pub trait StoreLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<Arc<dyn KnowledgeStore>>;

    /// Where the store lives, for diagnostics
    fn describe(&self) -> String;
}

/// Opens the on-disk store with a Cohere embedder
pub struct CohereStoreLoader {
    cohere: CohereConfig,
    db_path: PathBuf,
}

impl CohereStoreLoader {
    pub fn new(cohere: &CohereConfig, knowledge: &KnowledgeConfig) -> Self {
        Self {
            cohere: cohere.clone(),
            db_path: knowledge.db_path.clone(),
        }
    }
}

#[async_trait]
impl StoreLoader for CohereStoreLoader {
    async fn load(&self) -> anyhow::Result<Arc<dyn KnowledgeStore>> {
        if self.cohere.api_key.is_none() {
            return Err(LlmError::MissingApiKey.into());
        }
        let embedder = CohereClient::new(&self.cohere).context("failed to build embedding client")?;

        let path = self.db_path.clone();
        let db = tokio::task::spawn_blocking(move || VectorDb::open(path))
            .await
            .context("store open task failed")??;

        info!(
            path = %db.path().display(),
            documents = db.len(),
            embed_model = embedder.embed_model(),
            provider = embedder.base_url(),
            "Knowledge store opened"
        );
        Ok(Arc::new(EmbeddedStore::new(Arc::new(embedder), db)))
    }

    fn describe(&self) -> String {
        self.db_path.display().to_string()
    }
}

/// Observable state of the lazy knowledge base handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeState {
    Uninitialized,
    Ready,
    Unavailable,
}

impl fmt::Display for KnowledgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeState::Uninitialized => write!(f, "uninitialized"),
            KnowledgeState::Ready => write!(f, "ready"),
            KnowledgeState::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Lazily opened, shared knowledge base.
///
/// The first caller runs the loader; concurrent first callers wait for that
/// single attempt. Whatever it produced is kept: a failed load leaves the
/// knowledge base unavailable until restart.
pub struct KnowledgeBase {
    loader: Arc<dyn StoreLoader>,
    cell: OnceCell<Option<Arc<dyn KnowledgeStore>>>,
}

impl KnowledgeBase {
    pub fn new(loader: Arc<dyn StoreLoader>) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    /// A knowledge base that is already open (tests, embedding callers)
    pub fn with_store(store: Arc<dyn KnowledgeStore>) -> Self {
        struct Preloaded;

        #[async_trait]
        impl StoreLoader for Preloaded {
            async fn load(&self) -> anyhow::Result<Arc<dyn KnowledgeStore>> {
                anyhow::bail!("preloaded knowledge base has no loader")
            }

            fn describe(&self) -> String {
                "preloaded".to_string()
            }
        }

        Self {
            loader: Arc::new(Preloaded),
            cell: OnceCell::new_with(Some(Some(store))),
        }
    }

    /// Get the store, opening it on first use.
    ///
    /// Returns `None` when the store could not be opened.
    pub async fn store(&self) -> Option<Arc<dyn KnowledgeStore>> {
        self.cell
            .get_or_init(|| async {
                info!(location = %self.loader.describe(), "Loading knowledge store...");
                match self.loader.load().await {
                    Ok(store) => {
                        info!(store = store.store_name(), "Knowledge store loaded successfully");
                        Some(store)
                    }
                    Err(e) => {
                        warn!(
                            location = %self.loader.describe(),
                            error = %format!("{e:#}"),
                            "Error loading knowledge store"
                        );
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Current state without triggering a load
    pub fn state(&self) -> KnowledgeState {
        match self.cell.get() {
            None => KnowledgeState::Uninitialized,
            Some(Some(_)) => KnowledgeState::Ready,
            Some(None) => KnowledgeState::Unavailable,
        }
    }
}
