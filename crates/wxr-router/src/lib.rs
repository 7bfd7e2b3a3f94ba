//! Routing layer of WXR
//!
//! This crate provides the keyword classifier, the application context built
//! once per process, and the router that dispatches each question to the
//! weather or document pipeline.

mod classifier;
mod context;
mod router;


pub use classifier::{KeywordClassifier, WEATHER_KEYWORDS};
pub use context::AppContext;
pub use router::Router;

// Re-export core types for convenience
pub use wxr_core::{AppConfig, Error, Question, ResponseRecord, Result, Route};
