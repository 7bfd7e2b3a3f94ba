//! Error types for the WXR router

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of the ingestion pipeline that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStage {
    Load,
    Split,
    Embed,
    Reconcile,
    Upsert,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Load => "load",
            IngestStage::Split => "split",
            IngestStage::Embed => "embed",
            IngestStage::Reconcile => "reconcile",
            IngestStage::Upsert => "upsert",
        };
        f.write_str(name)
    }
}

/// Core error types for the WXR system
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(
        "Collection '{collection}' has dimension {existing}, but embeddings produce {expected}. \
         Enable QDRANT_AUTO_RECREATE=true to drop and recreate the collection automatically, \
         or choose a different collection name."
    )]
    DimensionMismatch {
        collection: String,
        existing: u64,
        expected: u64,
    },

    #[error(
        "Collection '{collection}' holds vectors from embedding model '{existing}', \
         but the active model is '{expected}'. Enable QDRANT_AUTO_RECREATE=true to drop and \
         recreate the collection automatically, or choose a different collection name."
    )]
    EmbeddingModelMismatch {
        collection: String,
        existing: String,
        expected: String,
    },

    #[error("Vector store is not reachable at {endpoint}: {reason}")]
    StoreUnreachable { endpoint: String, reason: String },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ingestion failed during {stage}: {source}")]
    Ingestion {
        stage: IngestStage,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an error with the ingestion stage it came from
    pub fn at_stage(self, stage: IngestStage) -> Self {
        Error::Ingestion {
            stage,
            source: Box::new(self),
        }
    }

    /// Failures a caller may recover from with a local fallback
    pub fn is_upstream_failure(&self) -> bool {
        matches!(self, Error::UpstreamUnavailable(_) | Error::Authentication(_))
    }

    /// Failures that a template or local backend may stand in for
    pub fn allows_fallback(&self) -> bool {
        self.is_upstream_failure() || self.is_not_found()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Stage of a failed ingestion, if this error came from one
    pub fn ingest_stage(&self) -> Option<IngestStage> {
        match self {
            Error::Ingestion { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_names_both_dimensions() {
        let err = Error::DimensionMismatch {
            collection: "pdf_documents".to_string(),
            existing: 384,
            expected: 768,
        };
        let message = err.to_string();
        assert!(message.contains("384"));
        assert!(message.contains("768"));
        assert!(message.contains("QDRANT_AUTO_RECREATE"));
    }

    #[test]
    fn test_ingestion_stage_is_preserved() {
        let err = Error::UpstreamUnavailable("timeout".to_string()).at_stage(IngestStage::Embed);
        assert_eq!(err.ingest_stage(), Some(IngestStage::Embed));
        assert!(err.to_string().starts_with("Ingestion failed during embed"));
    }

    #[test]
    fn test_fallback_classification() {
        assert!(Error::Authentication("bad token".into()).is_upstream_failure());
        assert!(Error::UpstreamUnavailable("503".into()).is_upstream_failure());
        assert!(!Error::InvalidInput("oops".into()).is_upstream_failure());
        assert!(Error::NotFound("city".into()).is_not_found());
        assert!(Error::NotFound("models/gemini-1.5-flash".into()).allows_fallback());
        assert!(!Error::NotFound("city".into()).is_upstream_failure());
        assert!(!Error::InvalidInput("oops".into()).allows_fallback());
    }
}
