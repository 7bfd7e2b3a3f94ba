//! Retrieval side of WXR
//!
//! This crate provides the vector store backends, the index manager that
//! keeps collections in line with the active embedder, the text splitter and
//! loaders, and the ingestion and answering pipelines built on them.

mod engine;
mod index_manager;
mod ingest;
mod loader;
mod splitter;
mod vector_store;

#[cfg(test)]
mod tests;

pub use engine::{build_context, RagAnswer, RagPipeline, RAG_SYSTEM_INSTRUCTION};
pub use index_manager::{CollectionState, CollectionStatus, IndexManager, Reconciliation};
pub use ingest::{IngestReport, IngestionPipeline};
pub use loader::{DocumentKind, FileLoader};
pub use splitter::{document_id, TextSplitter};
pub use vector_store::{LocalVectorStore, QdrantVectorStore, CONTENT_KEY, METADATA_KEY};

// Re-export core types for convenience
pub use wxr_core::{
    DocumentChunk, DocumentSource, Embedder, Error, IngestStage, Metadata, Page, Result, ScoredChunk,
    StoreSettings, VectorStore,
};
