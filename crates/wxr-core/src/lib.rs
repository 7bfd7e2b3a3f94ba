//! Core traits and types for WXR
//!
//! This crate defines the data model shared by the router and its pipelines
//! and the capability-facing interfaces for embedding, text generation,
//! vector storage, weather lookups and document loading. Concrete backends
//! live in the other workspace crates, which keeps the pipelines test-friendly.

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod types;
pub mod vector_store;
pub mod weather;

#[cfg(test)]
mod tests;

pub use config::{
    AppConfig, EmbeddingProvider, EmbeddingSettings, LlmProvider, LlmSettings,
    RagSettings, StoreBackend, StoreSettings, WeatherSettings,
};
pub use document::DocumentSource;
pub use embedding::{Embedder, DIMENSION_PROBE};
pub use error::{Error, IngestStage, Result};
pub use llm::{TextGenerator, DEFAULT_SYSTEM_INSTRUCTION};
pub use types::*;
pub use vector_store::{DistanceMetric, VectorPoint, VectorStore, EMBEDDING_MODEL_KEY};
pub use weather::WeatherProvider;
