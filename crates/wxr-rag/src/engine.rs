//! Retrieval-augmented answering

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use wxr_core::{Embedder, Error, Metadata, Result, ScoredChunk, TextGenerator};

use crate::index_manager::IndexManager;

/// System instruction for grounded answers
pub const RAG_SYSTEM_INSTRUCTION: &str =
    "You answer questions based on provided PDF context and cite short quotes.";

/// Answer text plus the metadata of every retrieved chunk, most similar first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<Metadata>,
}

impl RagAnswer {
    /// Degraded answer carrying the failure reason
    pub fn unavailable(error: &Error) -> Self {
        Self {
            answer: format!("RAG unavailable. Details: {}", error),
            sources: Vec::new(),
        }
    }
}

pub struct RagPipeline {
    index: Arc<IndexManager>,
    generator: Option<Arc<dyn TextGenerator>>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(index: Arc<IndexManager>, generator: Option<Arc<dyn TextGenerator>>, top_k: usize) -> Self {
        Self {
            index,
            generator,
            top_k: top_k.max(1),
        }
    }

    /// Answer `question` from the collection. Never fails: any error becomes
    /// a degraded answer with no sources.
    pub async fn answer(&self, embedder: &dyn Embedder, question: &str, collection: Option<&str>) -> RagAnswer {
        match self.try_answer(embedder, question, collection).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(target: "rag", error = %e, "answering failed");
                RagAnswer::unavailable(&e)
            }
        }
    }

    async fn try_answer(&self, embedder: &dyn Embedder, question: &str, collection: Option<&str>) -> Result<RagAnswer> {
        let collection = self.index.collection_name(collection);
        let chunks = self.index.query(collection, embedder, question, self.top_k).await?;

        if chunks.is_empty() {
            debug!(target: "rag", collection, "no chunks retrieved, answering with empty context");
        }

        let generator = self.generator.as_ref().ok_or_else(|| {
            Error::Configuration("no text generation backend configured (set GOOGLE_API_KEY or HF_TOKEN)".to_string())
        })?;

        let context = build_context(&chunks);
        let answer = generator.generate(RAG_SYSTEM_INSTRUCTION, &context, question).await?;

        info!(target: "rag", collection, retrieved = chunks.len(), "answer generated");
        Ok(RagAnswer {
            answer,
            sources: chunks.into_iter().map(|c| c.metadata).collect(),
        })
    }
}

/// Retrieved texts in the given order, separated by blank lines
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
