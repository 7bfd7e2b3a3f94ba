//! Document ingestion pipeline: load, split, embed, reconcile, upsert

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use wxr_core::{DocumentSource, Embedder, Error, IngestStage, Result};

use crate::index_manager::{IndexManager, Reconciliation};
use crate::splitter::TextSplitter;

/// Result of a completed ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub chunk_count: usize,
    pub collection: String,
    pub chunk_ids: Vec<String>,
    pub reconciliation: Reconciliation,
}

pub struct IngestionPipeline {
    index: Arc<IndexManager>,
    splitter: TextSplitter,
}

impl IngestionPipeline {
    pub fn new(index: Arc<IndexManager>, splitter: TextSplitter) -> Self {
        Self { index, splitter }
    }

    /// Ingest the document at `path`.
    ///
    /// Every failure is an [`Error::Ingestion`] naming the stage it came
    /// from. Points written before a failing upsert are not reported.
    pub async fn ingest(
        &self,
        source: &dyn DocumentSource,
        path: &Path,
        embedder: &dyn Embedder,
        collection: Option<&str>,
    ) -> Result<IngestReport> {
        let collection = self.index.collection_name(collection).to_string();
        let source_name = path.display().to_string();

        let pages = source
            .load_pages(path)
            .await
            .map_err(|e| e.at_stage(IngestStage::Load))?;

        let chunks = self.splitter.split_pages(&pages, &source_name);
        if chunks.is_empty() {
            return Err(Error::InvalidInput(format!("No text could be extracted from {}", source_name))
                .at_stage(IngestStage::Split));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| e.at_stage(IngestStage::Embed))?;
        if vectors.len() != texts.len() {
            return Err(Error::UpstreamUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                texts.len()
            ))
            .at_stage(IngestStage::Embed));
        }

        let reconciliation = self
            .index
            .ensure_collection(&collection, embedder)
            .await
            .map_err(|e| e.at_stage(IngestStage::Reconcile))?;

        let chunk_ids = self
            .index
            .upsert(&collection, embedder.name(), chunks, vectors)
            .await
            .map_err(|e| e.at_stage(IngestStage::Upsert))?;

        info!(
            target: "ingest",
            source = %source_name,
            collection = %collection,
            pages = pages.len(),
            chunks = chunk_ids.len(),
            "document ingested"
        );

        Ok(IngestReport {
            chunk_count: chunk_ids.len(),
            collection,
            chunk_ids,
            reconciliation,
        })
    }
}
