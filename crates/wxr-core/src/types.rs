//! Common types used across the WXR system

use std::fmt;

use serde::{Deserialize, Serialize};

/// Free-form metadata attached to chunks and returned as sources
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Fulfillment pipeline selected for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Weather,
    Rag,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Weather => "weather",
            Route::Rag => "rag",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming question.
///
/// Non-string inputs are coerced to their string form, so every value
/// that reaches the router can be classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Question(String);

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Question {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<String> for Question {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<serde_json::Value> for Question {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self(text),
            other => Self(other.to_string()),
        }
    }
}

impl AsRef<str> for Question {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final response assembled for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question: String,
    pub route: Route,
    pub answer: String,
    /// Metadata of retrieved chunks in similarity order; empty for weather
    pub sources: Vec<Metadata>,
}

impl ResponseRecord {
    pub fn weather(question: &Question, answer: String) -> Self {
        Self {
            question: question.as_str().to_string(),
            route: Route::Weather,
            answer,
            sources: Vec::new(),
        }
    }

    pub fn rag(question: &Question, answer: String, sources: Vec<Metadata>) -> Self {
        Self {
            question: question.as_str().to_string(),
            route: Route::Rag,
            answer,
            sources,
        }
    }
}

/// A bounded slice of a source document, ready to embed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: Metadata,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// A chunk returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
}

/// A page-level text unit produced by a document source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number within the source
    pub number: usize,
    pub text: String,
}

/// Current conditions as reported by a weather backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Location name as resolved by the backend
    pub location: Option<String>,
    pub description: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    /// Untouched payload, handed to the summarizer as context
    pub raw: serde_json::Value,
}

/// Measurement system for weather lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }

    pub fn wind_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric | Units::Standard => "m/s",
        }
    }
}
