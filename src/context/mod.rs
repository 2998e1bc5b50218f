//! Context module - Knowledge base and semantic search
//!
//! Provides the document store the answering and search services draw their
//! context from.
//!
//! ## KnowledgeStore trait
//!
//! The `KnowledgeStore` trait abstracts the query interface so the services
//! do not depend on how documents are embedded or stored. `KnowledgeBase`
//! wraps a store that is opened on first use and shared afterwards.

pub mod knowledge_store;
pub mod vector_db;

pub use knowledge_store::{
    CohereStoreLoader, EmbeddedStore, KnowledgeBase, KnowledgeState, KnowledgeStore, StoreLoader,
};
pub use vector_db::{Document, StoredDocument, VectorDb, VectorDbError};
