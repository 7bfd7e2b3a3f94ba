//! Vector store trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{DocumentChunk, Result, ScoredChunk};

/// Chunk metadata key naming the embedding model that produced the vector
pub const EMBEDDING_MODEL_KEY: &str = "embedding_model";

/// Distance metric configured on a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

/// A chunk and its embedding, ready to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: DocumentChunk,
}

/// Trait for vector stores (e.g., Qdrant, in-memory)
///
/// Collections are addressed by name. Every vector written to a collection
/// must match the dimension it was created with.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Verify the store answers at all
    async fn health_check(&self) -> Result<()>;

    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Configured vector dimension, or `None` if the collection is absent
    async fn collection_dimension(&self, collection: &str) -> Result<Option<u64>>;

    /// Embedding model recorded on the collection's points under
    /// [`EMBEDDING_MODEL_KEY`], or `None` when absent, empty or unstamped
    async fn collection_model(&self, collection: &str) -> Result<Option<String>>;

    async fn create_collection(&self, collection: &str, dimension: u64, metric: DistanceMetric) -> Result<()>;

    async fn delete_collection(&self, collection: &str) -> Result<()>;

    /// Write points and return their ids in input order
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<Vec<String>>;

    /// Nearest chunks to `vector`, most similar first
    async fn query_similar(&self, collection: &str, vector: Vec<f32>, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of points in a collection
    async fn count(&self, collection: &str) -> Result<u64>;

    /// Human-readable address used in error messages
    fn endpoint(&self) -> &str;
}
