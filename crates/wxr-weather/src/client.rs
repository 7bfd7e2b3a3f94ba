//! OpenWeather current-conditions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use wxr_core::{Error, Result, Units, WeatherProvider, WeatherReading, WeatherSettings};
use wxr_providers::http::{build_client, status_error, transport_error};

const SERVICE: &str = "OpenWeather";

pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl OpenWeatherClient {
    pub fn new(settings: &WeatherSettings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(Error::Configuration(
                "OPENWEATHER_API_KEY is required for weather lookups".to_string(),
            ));
        }

        Ok(Self {
            client: build_client(settings.timeout_secs)?,
            api_key: settings.api_key.clone(),
            endpoint: format!("{}/weather", settings.base_url.trim_end_matches('/')),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    fn request_url(&self, location: &str, units: Units) -> Result<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[("q", location), ("appid", self.api_key.as_str()), ("units", units.as_str())],
        )
        .map_err(|e| Error::Configuration(format!("Invalid weather endpoint {}: {}", self.endpoint, e)))
    }

    async fn fetch(&self, location: &str, units: Units) -> Result<WeatherReading> {
        let url = self.request_url(location, units)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("location '{}'", location)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(SERVICE, status, &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("Malformed {} response: {}", SERVICE, e)))?;
        Ok(parse_reading(body))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current_conditions(&self, location: &str, units: Units) -> Result<WeatherReading> {
        debug!(target: "weather", location, units = units.as_str(), "fetching current conditions");
        match timeout(self.timeout, self.fetch(location, units)).await {
            Ok(result) => result,
            Err(_) => Err(Error::UpstreamUnavailable(format!("{} request timed out", SERVICE))),
        }
    }
}

/// Pick the fields the summary template needs out of an OpenWeather payload
pub(crate) fn parse_reading(raw: Value) -> WeatherReading {
    WeatherReading {
        location: raw["name"].as_str().map(str::to_string),
        description: raw["weather"][0]["description"].as_str().map(str::to_string),
        temperature: raw["main"]["temp"].as_f64(),
        humidity: raw["main"]["humidity"].as_f64(),
        wind_speed: raw["wind"]["speed"].as_f64(),
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> WeatherSettings {
        WeatherSettings {
            api_key: "ow_test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_key() {
        assert!(matches!(
            OpenWeatherClient::new(&WeatherSettings::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_request_url_encodes_location() {
        let client = OpenWeatherClient::new(&settings()).unwrap();
        let url = client.request_url("New York", Units::Imperial).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openweathermap.org/data/2.5/weather?q=New+York&appid=ow_test&units=imperial"
        );
    }

    #[test]
    fn test_parse_reading() {
        let reading = parse_reading(json!({
            "name": "Tokyo",
            "weather": [{"description": "light rain"}],
            "main": {"temp": 18.4, "humidity": 82},
            "wind": {"speed": 3.6}
        }));
        assert_eq!(reading.location.as_deref(), Some("Tokyo"));
        assert_eq!(reading.description.as_deref(), Some("light rain"));
        assert_eq!(reading.temperature, Some(18.4));
        assert_eq!(reading.humidity, Some(82.0));
        assert_eq!(reading.wind_speed, Some(3.6));
    }

    #[test]
    fn test_parse_partial_reading() {
        let reading = parse_reading(json!({"main": {"temp": 5}}));
        assert_eq!(reading.description, None);
        assert_eq!(reading.temperature, Some(5.0));
        assert_eq!(reading.wind_speed, None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_upstream_failure() {
        let client = OpenWeatherClient::new(&WeatherSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..settings()
        })
        .unwrap();
        let err = client.current_conditions("Tokyo", Units::Metric).await.unwrap_err();
        assert!(err.is_upstream_failure());
    }
}
