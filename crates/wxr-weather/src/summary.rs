//! Weather summaries, generated or templated

use std::sync::Arc;

use tracing::warn;

use wxr_core::{Result, TextGenerator, Units, WeatherReading};

pub const SUMMARY_SYSTEM_INSTRUCTION: &str =
    "You turn raw weather JSON into a brief, user-friendly summary. Be concise and practical.";

pub struct WeatherSummarizer {
    generator: Option<Arc<dyn TextGenerator>>,
    units: Units,
}

impl WeatherSummarizer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, units: Units) -> Self {
        Self { generator, units }
    }

    /// Generated summary, or the template when generation is unavailable.
    ///
    /// Upstream, auth and not-found failures fall back; anything else is returned.
    pub async fn summarize(&self, city: &str, reading: &WeatherReading) -> Result<String> {
        let Some(generator) = self.generator.as_ref() else {
            return Ok(fallback_summary(city, reading, self.units));
        };

        let question = format!("Create a 3-sentence weather summary for {}.", city);
        match generator
            .generate(SUMMARY_SYSTEM_INSTRUCTION, &reading.raw.to_string(), &question)
            .await
        {
            Ok(summary) => Ok(summary),
            Err(e) if e.allows_fallback() => {
                warn!(target: "weather", error = %e, "summary generation failed, using template");
                Ok(fallback_summary(city, reading, self.units))
            }
            Err(e) => Err(e),
        }
    }
}

/// Deterministic summary: the conditions, then one sentence per present reading
pub fn fallback_summary(city: &str, reading: &WeatherReading, units: Units) -> String {
    let description = reading.description.as_deref().unwrap_or("weather data");
    let mut parts = vec![format!("Current conditions in {}: {}.", city, description)];

    if let Some(temperature) = reading.temperature {
        parts.push(format!("Temperature: {}{}.", temperature, units.temperature_symbol()));
    }
    if let Some(humidity) = reading.humidity {
        parts.push(format!("Humidity: {}%.", humidity));
    }
    if let Some(wind) = reading.wind_speed {
        parts.push(format!("Wind: {} {}.", wind, units.wind_symbol()));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use wxr_core::Error;

    struct Failing(fn() -> Error);

    #[async_trait]
    impl TextGenerator for Failing {
        async fn generate(&self, _: &str, _: &str, _: &str) -> Result<String> {
            Err((self.0)())
        }

        fn model_id(&self) -> &str {
            "failing"
        }
    }

    fn reading() -> WeatherReading {
        WeatherReading {
            location: Some("Tokyo".to_string()),
            description: Some("light rain".to_string()),
            temperature: Some(18.5),
            humidity: Some(82.0),
            wind_speed: None,
            raw: json!({}),
        }
    }

    #[test]
    fn test_fallback_template() {
        assert_eq!(
            fallback_summary("Tokyo", &reading(), Units::Metric),
            "Current conditions in Tokyo: light rain. Temperature: 18.5°C. Humidity: 82%."
        );
    }

    #[test]
    fn test_fallback_without_readings() {
        let empty = WeatherReading {
            location: None,
            description: None,
            temperature: None,
            humidity: None,
            wind_speed: Some(4.0),
            raw: json!({}),
        };
        assert_eq!(
            fallback_summary("Oslo", &empty, Units::Imperial),
            "Current conditions in Oslo: weather data. Wind: 4 mph."
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_uses_template() {
        let summarizer = WeatherSummarizer::new(
            Some(Arc::new(Failing(|| Error::UpstreamUnavailable("timeout".to_string())))),
            Units::Metric,
        );
        let summary = summarizer.summarize("Tokyo", &reading()).await.unwrap();
        assert!(summary.starts_with("Current conditions in Tokyo"));
    }

    #[tokio::test]
    async fn test_unknown_model_uses_template() {
        let summarizer = WeatherSummarizer::new(
            Some(Arc::new(Failing(|| {
                Error::NotFound("Gemini returned 404: models/gemini-1.5-flash is not found".to_string())
            }))),
            Units::Metric,
        );
        let summary = summarizer.summarize("Tokyo", &reading()).await.unwrap();
        assert_eq!(
            summary,
            "Current conditions in Tokyo: light rain. Temperature: 18.5°C. Humidity: 82%."
        );
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let summarizer = WeatherSummarizer::new(
            Some(Arc::new(Failing(|| Error::InvalidInput("bad prompt".to_string())))),
            Units::Metric,
        );
        assert!(summarizer.summarize("Tokyo", &reading()).await.is_err());
    }
}
