//! Google Gemini backends: generateContent and text embeddings

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use wxr_core::llm::{clean_answer, system_instruction, user_prompt};
use wxr_core::{Embedder, EmbeddingSettings, Error, LlmSettings, Result, TextGenerator};

use crate::http::{build_client, check_status, transport_error};

const SERVICE: &str = "Gemini";

/// Most requests `batchEmbedContents` accepts in one call
const MAX_BATCH_REQUESTS: usize = 100;

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Gemini chat model
pub struct GeminiChat {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl GeminiChat {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        if settings.google_api_key.is_empty() {
            return Err(Error::Configuration(
                "GOOGLE_API_KEY is required when LLM_PROVIDER=google".to_string(),
            ));
        }

        Ok(Self {
            client: build_client(settings.timeout_secs)?,
            api_key: settings.google_api_key.clone(),
            base_url: settings.google_base_url.trim_end_matches('/').to_string(),
            model: settings.google_model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    async fn perform_generation(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            system_instruction: Content::text(None, system),
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("Malformed {} response: {}", SERVICE, e)))?;

        let raw: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let answer = clean_answer(&raw);
        if answer.is_empty() {
            return Err(Error::UpstreamUnavailable(format!(
                "Empty response from {} model {}",
                SERVICE, self.model
            )));
        }
        Ok(answer)
    }
}

#[async_trait]
impl TextGenerator for GeminiChat {
    async fn generate(&self, system: &str, context: &str, question: &str) -> Result<String> {
        let prompt = user_prompt(context, question);
        let generation = self.perform_generation(system_instruction(system), &prompt);

        match timeout(self.timeout, generation).await {
            Ok(result) => result,
            Err(_) => Err(Error::UpstreamUnavailable(format!("{} request timed out", SERVICE))),
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

/// Gemini text embeddings
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        if settings.google_api_key.is_empty() {
            return Err(Error::Configuration(
                "GOOGLE_API_KEY is required for Google embeddings".to_string(),
            ));
        }

        Ok(Self {
            client: build_client(settings.timeout_secs)?,
            api_key: settings.google_api_key.clone(),
            base_url: settings.google_base_url.trim_end_matches('/').to_string(),
            model: settings.google_model.clone(),
        })
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.model)
    }

    /// One batch request per group of at most [`MAX_BATCH_REQUESTS`] texts, in input order
    fn batch_requests(&self, texts: &[String]) -> Vec<BatchEmbedRequest> {
        texts
            .chunks(MAX_BATCH_REQUESTS)
            .map(|group| BatchEmbedRequest {
                requests: group
                    .iter()
                    .map(|text| EmbedRequest {
                        model: self.model_path(),
                        content: Content::text(None, text),
                    })
                    .collect(),
            })
            .collect()
    }

    async fn send_batch(&self, url: &str, request: &BatchEmbedRequest) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("Malformed {} embedding response: {}", SERVICE, e)))?;

        if body.embeddings.len() != request.requests.len() {
            return Err(Error::UpstreamUnavailable(format!(
                "{} returned {} embeddings for {} inputs",
                SERVICE,
                body.embeddings.len(),
                request.requests.len()
            )));
        }
        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/{}:embedContent", self.base_url, self.model_path());
        let request = EmbedRequest {
            model: self.model_path(),
            content: Content::text(None, text),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("Malformed {} embedding response: {}", SERVICE, e)))?;
        Ok(body.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model_path());
        let mut vectors = Vec::with_capacity(texts.len());
        for request in self.batch_requests(texts) {
            vectors.extend(self.send_batch(&url, &request).await?);
        }
        Ok(vectors)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
