//! Embedding capability

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::{Error, Result};

/// Text embedded to discover a backend's output dimension
pub const DIMENSION_PROBE: &str = "dimension probe";

/// Trait for embedding backends
///
/// Every instance must produce vectors of one stable length.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single query text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        try_join_all(texts.iter().map(|text| self.embed(text))).await
    }

    /// Discover the output dimension with a single probe embedding
    async fn probe_dimension(&self) -> Result<usize> {
        let vector = self.embed(DIMENSION_PROBE).await?;
        if vector.is_empty() {
            return Err(Error::UpstreamUnavailable(format!(
                "{} returned an empty probe embedding",
                self.name()
            )));
        }
        Ok(vector.len())
    }

    /// Short backend name for logs and status output
    fn name(&self) -> &str;
}
