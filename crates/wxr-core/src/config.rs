//! Resolved configuration
//!
//! The pipelines receive these structs fully resolved; only the binary
//! calls [`AppConfig::from_env`].

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result, Units};

/// Which chat backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Google when a Google key is present, Hugging Face otherwise
    #[default]
    Auto,
    HuggingFace,
    Google,
    /// No remote generator; callers use their deterministic fallbacks
    Disabled,
}

/// Which embedding backend to prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Google if keyed, then a probed Hugging Face endpoint, then local
    #[default]
    Auto,
    HuggingFace,
    Google,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    #[serde(skip_serializing, default)]
    pub hf_api_key: String,
    pub hf_model: String,
    pub hf_provider: String,
    pub hf_base_url: String,
    #[serde(skip_serializing, default)]
    pub google_api_key: String,
    pub google_model: String,
    pub google_base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Auto,
            hf_api_key: String::new(),
            hf_model: "Qwen/Qwen3-4B-Thinking-2507".to_string(),
            hf_provider: "nscale".to_string(),
            hf_base_url: "https://router.huggingface.co".to_string(),
            google_api_key: String::new(),
            google_model: "gemini-1.5-flash".to_string(),
            google_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.3,
            max_tokens: 512,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    #[serde(skip_serializing, default)]
    pub hf_api_key: String,
    pub hf_model: String,
    pub hf_base_url: String,
    #[serde(skip_serializing, default)]
    pub google_api_key: String,
    pub google_model: String,
    pub google_base_url: String,
    pub local_dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Auto,
            hf_api_key: String::new(),
            hf_model: "BAAI/bge-small-en-v1.5".to_string(),
            hf_base_url: "https://router.huggingface.co/hf-inference".to_string(),
            google_api_key: String::new(),
            google_model: "text-embedding-004".to_string(),
            google_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            local_dimension: 384,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSettings {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub base_url: String,
    pub units: Units,
    pub default_location: String,
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            units: Units::Metric,
            default_location: "London".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub url: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub collection: String,
    pub auto_recreate: bool,
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Qdrant,
            url: "http://localhost:6334".to_string(),
            api_key: String::new(),
            collection: "pdf_documents".to_string(),
            auto_recreate: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
            top_k: 4,
        }
    }
}

impl RagSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("CHUNK_SIZE must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("RAG_TOP_K must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Complete configuration for one process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub embeddings: EmbeddingSettings,
    pub weather: WeatherSettings,
    pub store: StoreSettings,
    pub rag: RagSettings,
}

impl AppConfig {
    /// Create configuration from environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let hf_api_key = ["HF_TOKEN", "HUGGINGFACEHUB_API_TOKEN", "HUGGING_FACE_HUB_TOKEN", "HUGGINGFACE_API_KEY"]
            .iter()
            .find_map(|key| get(*key))
            .unwrap_or_default();
        let google_api_key = get("GOOGLE_API_KEY").unwrap_or_default();
        let http_timeout = parse_number(&get, "HTTP_TIMEOUT_SECS", 30u64)?;

        let defaults = LlmSettings::default();
        let llm_backend = get("LLM_BACKEND").map(|v| v.to_lowercase());
        let provider = if llm_backend.as_deref() == Some("local") {
            LlmProvider::Disabled
        } else {
            match get("LLM_PROVIDER").map(|v| v.to_lowercase()).as_deref() {
                None => LlmProvider::Auto,
                Some("google") => LlmProvider::Google,
                Some("huggingface") | Some("hf") => LlmProvider::HuggingFace,
                Some(other) => {
                    return Err(Error::Configuration(format!(
                        "Unknown LLM_PROVIDER '{}'; expected 'google' or 'huggingface'",
                        other
                    )));
                }
            }
        };
        let llm = LlmSettings {
            provider,
            hf_api_key: hf_api_key.clone(),
            hf_model: get("HF_LLM_MODEL").unwrap_or(defaults.hf_model),
            hf_provider: get("HF_PROVIDER").unwrap_or(defaults.hf_provider),
            hf_base_url: defaults.hf_base_url,
            google_api_key: google_api_key.clone(),
            google_model: get("GOOGLE_LLM_MODEL").unwrap_or(defaults.google_model),
            google_base_url: defaults.google_base_url,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            timeout_secs: http_timeout,
        };

        let defaults = EmbeddingSettings::default();
        let forced_local = get("EMBEDDINGS_BACKEND").map(|v| v.to_lowercase()).as_deref() == Some("local");
        let provider = match get("EMBEDDINGS_PROVIDER").map(|v| v.to_lowercase()).as_deref() {
            Some("google") => EmbeddingProvider::Google,
            Some("huggingface") | Some("hf") => EmbeddingProvider::HuggingFace,
            Some("local") => EmbeddingProvider::Local,
            None if forced_local => EmbeddingProvider::Local,
            None => EmbeddingProvider::Auto,
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "Unknown EMBEDDINGS_PROVIDER '{}'; expected 'google', 'huggingface' or 'local'",
                    other
                )));
            }
        };
        let embeddings = EmbeddingSettings {
            provider,
            hf_api_key,
            hf_model: get("EMBEDDINGS_MODEL").unwrap_or(defaults.hf_model),
            hf_base_url: defaults.hf_base_url,
            google_api_key,
            google_model: get("GOOGLE_EMBEDDINGS_MODEL").unwrap_or(defaults.google_model),
            google_base_url: defaults.google_base_url,
            local_dimension: parse_number(&get, "LOCAL_EMBEDDINGS_DIM", defaults.local_dimension)?,
            timeout_secs: http_timeout,
        };

        let defaults = WeatherSettings::default();
        let units = match get("WEATHER_UNITS").map(|v| v.to_lowercase()).as_deref() {
            None | Some("metric") => Units::Metric,
            Some("imperial") => Units::Imperial,
            Some("standard") => Units::Standard,
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "Unknown WEATHER_UNITS '{}'; expected metric, imperial or standard",
                    other
                )));
            }
        };
        let weather = WeatherSettings {
            api_key: get("OPENWEATHER_API_KEY").unwrap_or_default(),
            base_url: defaults.base_url,
            units,
            default_location: get("WEATHER_DEFAULT_LOCATION").unwrap_or(defaults.default_location),
            timeout_secs: defaults.timeout_secs,
        };

        let defaults = StoreSettings::default();
        let backend = match get("VECTOR_STORE").map(|v| v.to_lowercase()).as_deref() {
            None | Some("qdrant") => StoreBackend::Qdrant,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "Unknown VECTOR_STORE '{}'; expected 'qdrant' or 'memory'",
                    other
                )));
            }
        };
        let url = get("QDRANT_URL").unwrap_or(defaults.url);
        Url::parse(&url)
            .map_err(|e| Error::Configuration(format!("QDRANT_URL '{}' is not a valid URL: {}", url, e)))?;
        let store = StoreSettings {
            backend,
            url,
            api_key: get("QDRANT_API_KEY").unwrap_or_default(),
            collection: get("QDRANT_COLLECTION").unwrap_or(defaults.collection),
            auto_recreate: get("QDRANT_AUTO_RECREATE").is_some_and(|v| parse_flag(&v)),
            timeout_secs: http_timeout,
        };

        let defaults = RagSettings::default();
        let rag = RagSettings {
            chunk_size: parse_number(&get, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_number(&get, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parse_number(&get, "RAG_TOP_K", defaults.top_k)?,
        };
        rag.validate()?;

        Ok(Self {
            llm,
            embeddings,
            weather,
            store,
            rag,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn parse_number<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Configuration(format!("{} must be a number, got '{}'", key, raw))),
    }
}
