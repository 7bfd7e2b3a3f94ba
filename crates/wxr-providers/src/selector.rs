//! Backend selection for embeddings and text generation

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use wxr_core::{
    Embedder, EmbeddingProvider, EmbeddingSettings, Error, LlmProvider, LlmSettings, Result,
    TextGenerator,
};

use crate::{GeminiChat, GeminiEmbedder, HuggingFaceChat, HuggingFaceEmbedder, LocalEmbedder};

/// Text embedded to validate a remote embedding endpoint
const VALIDATION_PROBE: &str = "ping";

/// Which embedding backend ended up active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Google,
    HuggingFace,
    Local,
}

/// The active embedding backend together with its probed dimension
pub struct ResolvedEmbedder {
    backend: Arc<dyn Embedder>,
    kind: EmbeddingBackend,
    dimension: usize,
}

impl ResolvedEmbedder {
    /// Probe `backend` once and remember its dimension
    pub async fn probe(backend: Arc<dyn Embedder>, kind: EmbeddingBackend) -> Result<Self> {
        let dimension = backend.probe_dimension().await?;
        Ok(Self {
            backend,
            kind,
            dimension,
        })
    }

    pub fn kind(&self) -> EmbeddingBackend {
        self.kind
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl Embedder for ResolvedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.backend.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.backend.embed_batch(texts).await
    }

    async fn probe_dimension(&self) -> Result<usize> {
        Ok(self.dimension)
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}

/// Resolves the embedding backend once and caches it until [`reset`].
///
/// [`reset`]: EmbeddingSelector::reset
pub struct EmbeddingSelector {
    settings: EmbeddingSettings,
    active: Mutex<Option<Arc<ResolvedEmbedder>>>,
}

impl EmbeddingSelector {
    pub fn new(settings: EmbeddingSettings) -> Self {
        Self {
            settings,
            active: Mutex::new(None),
        }
    }

    /// Start with an already-chosen backend (tests, embedded use)
    pub fn with_embedder(settings: EmbeddingSettings, embedder: ResolvedEmbedder) -> Self {
        Self {
            settings,
            active: Mutex::new(Some(Arc::new(embedder))),
        }
    }

    /// Return the active embedder, selecting it on first use
    pub async fn resolve(&self) -> Result<Arc<ResolvedEmbedder>> {
        let mut active = self.active.lock().await;
        if let Some(embedder) = active.as_ref() {
            return Ok(embedder.clone());
        }

        let embedder = Arc::new(self.select().await?);
        info!(
            target: "embeddings",
            backend = ?embedder.kind(),
            model = embedder.name(),
            dimension = embedder.dimension(),
            "embedding backend selected"
        );
        *active = Some(embedder.clone());
        Ok(embedder)
    }

    /// Forget the cached choice; the next `resolve` selects again
    pub async fn reset(&self) {
        *self.active.lock().await = None;
    }

    async fn select(&self) -> Result<ResolvedEmbedder> {
        let settings = &self.settings;
        match settings.provider {
            EmbeddingProvider::Google => self.google().await,
            EmbeddingProvider::Local => self.local().await,
            EmbeddingProvider::HuggingFace => self.huggingface_or_local().await,
            EmbeddingProvider::Auto => {
                if !settings.google_api_key.is_empty() {
                    self.google().await
                } else if !settings.hf_api_key.is_empty() {
                    self.huggingface_or_local().await
                } else {
                    self.local().await
                }
            }
        }
    }

    async fn google(&self) -> Result<ResolvedEmbedder> {
        let embedder = GeminiEmbedder::new(&self.settings)?;
        ResolvedEmbedder::probe(Arc::new(embedder), EmbeddingBackend::Google).await
    }

    async fn local(&self) -> Result<ResolvedEmbedder> {
        let embedder = LocalEmbedder::new(self.settings.local_dimension)?;
        ResolvedEmbedder::probe(Arc::new(embedder), EmbeddingBackend::Local).await
    }

    /// Validate the remote endpoint with a probe embedding; fall back to the
    /// local embedder when the endpoint is down, rejects the token or does
    /// not serve the model
    async fn huggingface_or_local(&self) -> Result<ResolvedEmbedder> {
        let remote = match HuggingFaceEmbedder::new(&self.settings) {
            Ok(remote) => remote,
            Err(Error::Configuration(reason)) if self.settings.provider == EmbeddingProvider::Auto => {
                warn!(target: "embeddings", %reason, "remote embeddings not configured, using local backend");
                return self.local().await;
            }
            Err(e) => return Err(e),
        };

        match remote.embed(VALIDATION_PROBE).await {
            Ok(vector) if !vector.is_empty() => Ok(ResolvedEmbedder {
                dimension: vector.len(),
                backend: Arc::new(remote),
                kind: EmbeddingBackend::HuggingFace,
            }),
            Ok(_) => {
                warn!(target: "embeddings", "remote probe returned an empty vector, using local backend");
                self.local().await
            }
            Err(e) if e.allows_fallback() => {
                warn!(target: "embeddings", error = %e, "remote embeddings unavailable, using local backend");
                self.local().await
            }
            Err(e) => Err(e),
        }
    }
}

/// Build the configured chat backend.
///
/// Returns `Ok(None)` when generation is disabled or, in auto mode, when no
/// credential is present. An explicitly chosen provider without its key is
/// a configuration error.
pub fn build_text_generator(settings: &LlmSettings) -> Result<Option<Arc<dyn TextGenerator>>> {
    let generator: Arc<dyn TextGenerator> = match settings.provider {
        LlmProvider::Disabled => {
            info!(target: "llm", "remote generation disabled (LLM_BACKEND=local)");
            return Ok(None);
        }
        LlmProvider::Google => Arc::new(GeminiChat::new(settings)?),
        LlmProvider::HuggingFace => Arc::new(HuggingFaceChat::new(settings)?),
        LlmProvider::Auto => {
            if !settings.google_api_key.is_empty() {
                Arc::new(GeminiChat::new(settings)?)
            } else if !settings.hf_api_key.is_empty() {
                Arc::new(HuggingFaceChat::new(settings)?)
            } else {
                warn!(target: "llm", "no GOOGLE_API_KEY or HF_TOKEN set; answers will use fallbacks");
                return Ok(None);
            }
        }
    };

    info!(target: "llm", model = generator.model_id(), "text generation backend ready");
    Ok(Some(generator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single HTTP request with a fixed status and body
    async fn respond_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = vec![0u8; 16 * 1024];
                let _ = socket.read(&mut request).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    fn unreachable_hf() -> EmbeddingSettings {
        EmbeddingSettings {
            provider: EmbeddingProvider::HuggingFace,
            hf_api_key: "hf_test".to_string(),
            hf_base_url: "http://127.0.0.1:9".to_string(),
            local_dimension: 32,
            timeout_secs: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_credentials_selects_local() {
        let selector = EmbeddingSelector::new(EmbeddingSettings::default());
        let embedder = selector.resolve().await.unwrap();
        assert_eq!(embedder.kind(), EmbeddingBackend::Local);
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn test_choice_is_cached_until_reset() {
        let selector = EmbeddingSelector::new(EmbeddingSettings::default());
        let first = selector.resolve().await.unwrap();
        let second = selector.resolve().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        selector.reset().await;
        let third = selector.resolve().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[tokio::test]
    async fn test_unreachable_remote_falls_back_to_local() {
        let selector = EmbeddingSelector::new(unreachable_hf());
        let embedder = selector.resolve().await.unwrap();
        assert_eq!(embedder.kind(), EmbeddingBackend::Local);
        assert_eq!(embedder.dimension(), 32);
    }

    #[tokio::test]
    async fn test_unserved_model_falls_back_to_local() {
        let base_url = respond_once("404 Not Found", r#"{"error":"Model not found"}"#).await;
        let selector = EmbeddingSelector::new(EmbeddingSettings {
            provider: EmbeddingProvider::Auto,
            hf_api_key: "hf_test".to_string(),
            hf_base_url: base_url,
            local_dimension: 24,
            timeout_secs: 5,
            ..Default::default()
        });

        let embedder = selector.resolve().await.unwrap();
        assert_eq!(embedder.kind(), EmbeddingBackend::Local);
        assert_eq!(embedder.dimension(), 24);
    }

    #[tokio::test]
    async fn test_explicit_google_without_key_is_fatal() {
        let selector = EmbeddingSelector::new(EmbeddingSettings {
            provider: EmbeddingProvider::Google,
            ..Default::default()
        });
        assert!(matches!(selector.resolve().await, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_generator_selection() {
        let disabled = LlmSettings {
            provider: LlmProvider::Disabled,
            hf_api_key: "hf_test".to_string(),
            ..Default::default()
        };
        assert!(build_text_generator(&disabled).unwrap().is_none());

        assert!(build_text_generator(&LlmSettings::default()).unwrap().is_none());

        let explicit = LlmSettings {
            provider: LlmProvider::Google,
            ..Default::default()
        };
        assert!(matches!(build_text_generator(&explicit), Err(Error::Configuration(_))));

        let google = LlmSettings {
            google_api_key: "g_test".to_string(),
            hf_api_key: "hf_test".to_string(),
            ..Default::default()
        };
        let generator = build_text_generator(&google).unwrap().unwrap();
        assert_eq!(generator.model_id(), "gemini-1.5-flash");
    }
}
