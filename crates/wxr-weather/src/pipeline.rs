//! Weather answering pipeline: extract, fetch, summarize, persist

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use wxr_core::{Embedder, Error, Metadata, Result, Units, WeatherProvider, WeatherReading};
use wxr_rag::IndexManager;

use crate::location::{last_token, LocationExtractor};
use crate::summary::WeatherSummarizer;

pub struct WeatherPipeline {
    provider: Option<Arc<dyn WeatherProvider>>,
    extractor: LocationExtractor,
    summarizer: WeatherSummarizer,
    units: Units,
    index: Arc<IndexManager>,
}

impl WeatherPipeline {
    pub fn new(
        provider: Option<Arc<dyn WeatherProvider>>,
        extractor: LocationExtractor,
        summarizer: WeatherSummarizer,
        units: Units,
        index: Arc<IndexManager>,
    ) -> Self {
        Self {
            provider,
            extractor,
            summarizer,
            units,
            index,
        }
    }

    /// Answer a weather question. Never fails: lookup errors become an
    /// explanatory answer. When `embedder` is given the summary is also
    /// written to the default collection on a best-effort basis.
    pub async fn answer(&self, question: &str, embedder: Option<&dyn Embedder>) -> String {
        let location = self.extractor.extract(question);

        let summary = match self.lookup(&location).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(target: "weather", location = %location, error = %e, "weather lookup failed");
                return format!("Weather lookup unavailable right now. Details: {}", e);
            }
        };

        match embedder {
            Some(embedder) => {
                if let Err(e) = self.persist(embedder, &location, &summary).await {
                    warn!(target: "weather", location = %location, error = %e, "could not store weather summary");
                }
            }
            None => warn!(target: "weather", "no embedder available, weather summary not stored"),
        }

        summary
    }

    async fn lookup(&self, location: &str) -> Result<String> {
        let reading = self.fetch(location).await?;
        self.summarizer.summarize(location, &reading).await
    }

    /// Fetch conditions, retrying once with the last token on not-found
    async fn fetch(&self, location: &str) -> Result<WeatherReading> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| Error::Configuration("OPENWEATHER_API_KEY is not set".to_string()))?;

        match provider.current_conditions(location, self.units).await {
            Err(e) if e.is_not_found() => match last_token(location) {
                Some(token) if token != location => {
                    info!(target: "weather", location, retry = token, "location not found, retrying");
                    provider.current_conditions(token, self.units).await
                }
                _ => Err(e),
            },
            other => other,
        }
    }

    async fn persist(&self, embedder: &dyn Embedder, location: &str, summary: &str) -> Result<Vec<String>> {
        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), json!("weather"));
        metadata.insert("city".to_string(), json!(location));

        let collection = self.index.collection_name(None).to_string();
        self.index
            .add_texts(&collection, embedder, vec![(summary.to_string(), metadata)])
            .await
    }
}
