//! Embedding and text-generation backends for WXR
//!
//! This crate provides the remote Hugging Face and Gemini implementations of
//! the core `Embedder` and `TextGenerator` traits, a deterministic local
//! embedder, and the selection logic that picks among them.

mod gemini;
pub mod http;
mod huggingface;
mod local;
mod selector;


pub use gemini::{GeminiChat, GeminiEmbedder};
pub use huggingface::{HuggingFaceChat, HuggingFaceEmbedder};
pub use local::LocalEmbedder;
pub use selector::{build_text_generator, EmbeddingBackend, EmbeddingSelector, ResolvedEmbedder};

// Re-export core types for convenience
pub use wxr_core::{Embedder, EmbeddingSettings, Error, LlmSettings, Result, TextGenerator};
