//! Scenario tests for the weather pipeline

#[cfg(test)]
mod snapshot_tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use insta::assert_yaml_snapshot;
    use serde_json::json;
    use wxr_core::{DistanceMetric, StoreSettings, TextGenerator, VectorStore};
    use wxr_providers::LocalEmbedder;
    use wxr_rag::{IndexManager, LocalVectorStore};

    use crate::{
        Error, LocationExtractor, Result, Units, WeatherPipeline, WeatherProvider, WeatherReading,
        WeatherSummarizer,
    };

    /// Chat backend whose configured model no longer exists
    struct RetiredModel;

    #[async_trait]
    impl TextGenerator for RetiredModel {
        async fn generate(&self, _system: &str, _context: &str, _question: &str) -> Result<String> {
            Err(Error::NotFound(
                "Gemini returned 404: models/gemini-1.5-flash is not found".to_string(),
            ))
        }

        fn model_id(&self) -> &str {
            "gemini-1.5-flash"
        }
    }

    /// Knows a fixed set of cities and records every lookup
    struct FakeWeather {
        known: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeWeather {
        fn new(known: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                known: known.to_vec(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current_conditions(&self, location: &str, _units: Units) -> Result<WeatherReading> {
            self.calls.lock().unwrap().push(location.to_string());
            if !self.known.contains(&location) {
                return Err(Error::NotFound(format!("location '{}'", location)));
            }
            Ok(WeatherReading {
                location: Some(location.to_string()),
                description: Some("clear sky".to_string()),
                temperature: Some(21.0),
                humidity: Some(40.0),
                wind_speed: Some(2.5),
                raw: json!({"name": location}),
            })
        }
    }

    fn pipeline(provider: Arc<FakeWeather>, store: Arc<LocalVectorStore>) -> WeatherPipeline {
        let settings = StoreSettings {
            collection: "pdf_documents".to_string(),
            ..Default::default()
        };
        WeatherPipeline::new(
            Some(provider),
            LocationExtractor::new("London"),
            WeatherSummarizer::new(None, Units::Metric),
            Units::Metric,
            Arc::new(IndexManager::new(store, &settings)),
        )
    }

    #[tokio::test]
    async fn test_tokyo_answer_is_persisted() {
        let provider = FakeWeather::new(&["Tokyo"]);
        let store = Arc::new(LocalVectorStore::new());
        let embedder = LocalEmbedder::new(16).unwrap();

        let answer = pipeline(provider.clone(), store.clone())
            .answer("What's the weather in Tokyo?", Some(&embedder))
            .await;

        assert_eq!(
            answer,
            "Current conditions in Tokyo: clear sky. Temperature: 21°C. Humidity: 40%. Wind: 2.5 m/s."
        );
        assert_eq!(provider.calls(), vec!["Tokyo"]);

        let stored = store.query_similar("pdf_documents", vec![1.0; 16], 4).await.unwrap();
        assert_yaml_snapshot!(stored[0].metadata, @r###"
        city: Tokyo
        embedding_model: local-hash
        type: weather
        "###);
    }

    #[tokio::test]
    async fn test_not_found_retries_last_token_once() {
        let provider = FakeWeather::new(&["York"]);
        let answer = pipeline(provider.clone(), Arc::new(LocalVectorStore::new()))
            .answer("Forecast in New York today", None)
            .await;

        assert!(answer.starts_with("Current conditions in New York"));
        assert_eq!(provider.calls(), vec!["New York", "York"]);
    }

    #[tokio::test]
    async fn test_unknown_location_degrades() {
        let provider = FakeWeather::new(&[]);
        let answer = pipeline(provider.clone(), Arc::new(LocalVectorStore::new()))
            .answer("Weather in Atlantis please", None)
            .await;

        assert!(answer.starts_with("Weather lookup unavailable right now. Details:"));
        assert_eq!(provider.calls(), vec!["Atlantis"]);
    }

    #[tokio::test]
    async fn test_missing_chat_model_keeps_reading() {
        let settings = StoreSettings::default();
        let pipeline = WeatherPipeline::new(
            Some(FakeWeather::new(&["Tokyo"])),
            LocationExtractor::new("London"),
            WeatherSummarizer::new(Some(Arc::new(RetiredModel)), Units::Metric),
            Units::Metric,
            Arc::new(IndexManager::new(Arc::new(LocalVectorStore::new()), &settings)),
        );

        let answer = pipeline.answer("What's the weather in Tokyo?", None).await;
        assert_eq!(
            answer,
            "Current conditions in Tokyo: clear sky. Temperature: 21°C. Humidity: 40%. Wind: 2.5 m/s."
        );
    }

    #[tokio::test]
    async fn test_missing_provider_degrades() {
        let settings = StoreSettings::default();
        let pipeline = WeatherPipeline::new(
            None,
            LocationExtractor::new("London"),
            WeatherSummarizer::new(None, Units::Metric),
            Units::Metric,
            Arc::new(IndexManager::new(Arc::new(LocalVectorStore::new()), &settings)),
        );

        let answer = pipeline.answer("Is it windy?", None).await;
        assert!(answer.contains("OPENWEATHER_API_KEY"));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_answer() {
        let provider = FakeWeather::new(&["London"]);
        let store = Arc::new(LocalVectorStore::new());
        store
            .create_collection("pdf_documents", 3, DistanceMetric::Cosine)
            .await
            .unwrap();
        let embedder = LocalEmbedder::new(16).unwrap();

        let answer = pipeline(provider, store.clone())
            .answer("How humid is it?", Some(&embedder))
            .await;

        assert!(answer.starts_with("Current conditions in London"));
        assert_eq!(store.count("pdf_documents").await.unwrap(), 0);
    }
}
