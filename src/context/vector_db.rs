//! Vector Database for Knowledge Documents
//!
//! Reads a pre-built document store from disk. Each record holds the document
//! text, its provenance metadata, and the embedding computed when the store was
//! built. Lookups rank every record by squared Euclidean distance to the query
//! embedding, which is the default metric of the collections the store is
//! exported from.
//!
//! Layout: a sled database directory with a single `documents` tree,
//! keyed by document id, values are JSON-serialized `StoredDocument`s.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Tree holding the document records
const DOCUMENTS_TREE: &str = "documents";

/// Files sled writes into every database directory
const STORE_MARKERS: [&str; 2] = ["conf", "db"];

/// Error type for vector database operations
#[derive(Debug, thiserror::Error)]
pub enum VectorDbError {
    #[error("knowledge store not found at {0}")]
    NotFound(PathBuf),
    #[error("knowledge store path {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("{0} does not contain a knowledge store")]
    NotAStore(PathBuf),
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("corrupt document record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("document {id} has {found}-dimensional embedding, query has {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
}

/// A retrieved knowledge document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    /// Provenance such as `source` file and `page`
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// `source` metadata entry, if present
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// On-disk record: a document plus its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(flatten)]
    pub document: Document,
    pub embedding: Vec<f32>,
}

/// Handle to an opened document store
#[derive(Clone)]
pub struct VectorDb {
    db: Arc<sled::Db>,
    documents: sled::Tree,
    path: PathBuf,
}

impl VectorDb {
    /// Open an existing store.
    ///
    /// The directory must already hold a sled database with a `documents`
    /// tree. Anything else is rejected before sled touches the directory,
    /// so this never creates or initialises a store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VectorDbError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VectorDbError::NotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(VectorDbError::NotADirectory(path.to_path_buf()));
        }
        if !STORE_MARKERS.iter().all(|name| path.join(name).is_file()) {
            return Err(VectorDbError::NotAStore(path.to_path_buf()));
        }

        let db = sled::Config::new().path(path).open()?;
        let has_documents = db
            .tree_names()
            .iter()
            .any(|name| &**name == DOCUMENTS_TREE.as_bytes());
        if !has_documents {
            return Err(VectorDbError::NotAStore(path.to_path_buf()));
        }

        let documents = db.open_tree(DOCUMENTS_TREE)?;
        debug!(path = %path.display(), documents = documents.len(), "Opened knowledge store");
        Ok(Self {
            db: Arc::new(db),
            documents,
            path: path.to_path_buf(),
        })
    }

    /// Open a store, creating it if missing. For building stores and test
    /// fixtures; the server only calls [`VectorDb::open`].
    #[doc(hidden)]
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self, VectorDbError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        Ok(Self {
            db: Arc::new(db),
            documents,
            path: path.to_path_buf(),
        })
    }

    /// Insert or replace a document record
    pub fn upsert(&self, record: &StoredDocument) -> Result<(), VectorDbError> {
        let value = serde_json::to_vec(record)?;
        self.documents.insert(record.document.id.as_bytes(), value)?;
        Ok(())
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), VectorDbError> {
        self.db.flush()?;
        Ok(())
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Location of the store on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the `k` documents nearest to `query`, closest first, paired
    /// with their squared Euclidean distance.
    ///
    /// Equal distances are ordered by document id so repeated lookups over
    /// an unchanged store return identical sequences.
    pub fn similarity_search_with_score(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(Document, f32)>, VectorDbError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(Document, f32)> = Vec::with_capacity(self.len());
        for item in self.documents.iter() {
            let (key, value) = item?;
            let record: StoredDocument =
                serde_json::from_slice(&value).map_err(|source| VectorDbError::Corrupt {
                    key: String::from_utf8_lossy(&key).into_owned(),
                    source,
                })?;

            if record.embedding.len() != query.len() {
                return Err(VectorDbError::DimensionMismatch {
                    id: record.document.id,
                    expected: query.len(),
                    found: record.embedding.len(),
                });
            }

            let distance = squared_l2(query, &record.embedding);
            scored.push((record.document, distance));
        }

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        scored.truncate(k);

        debug!(
            candidates = self.len(),
            returned = scored.len(),
            "Vector similarity search"
        );
        Ok(scored)
    }

    /// Same as `similarity_search_with_score` without the distances
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<Document>, VectorDbError> {
        Ok(self
            .similarity_search_with_score(query, k)?
            .into_iter()
            .map(|(doc, _)| doc)
            .collect())
    }
}

/// Squared Euclidean distance between two equal-length vectors
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
