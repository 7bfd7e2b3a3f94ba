//! Weather side of WXR
//!
//! This crate provides the OpenWeather client, location extraction, the
//! summarizer with its deterministic template, and the weather pipeline.

mod client;
mod location;
mod pipeline;
mod summary;

#[cfg(test)]
mod tests;

pub use client::OpenWeatherClient;
pub use location::{last_token, LocationExtractor};
pub use pipeline::WeatherPipeline;
pub use summary::{fallback_summary, WeatherSummarizer, SUMMARY_SYSTEM_INSTRUCTION};

// Re-export core types for convenience
pub use wxr_core::{Error, Result, Units, WeatherProvider, WeatherReading, WeatherSettings};
