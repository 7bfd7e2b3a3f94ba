//! Hugging Face router backends: chat completions and feature extraction

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;

use wxr_core::llm::{clean_answer, system_instruction, user_prompt};
use wxr_core::{Embedder, EmbeddingSettings, Error, LlmSettings, Result, TextGenerator};

use crate::http::{build_client, check_status, transport_error};

const SERVICE: &str = "Hugging Face";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Chat model served through the Hugging Face inference router
pub struct HuggingFaceChat {
    client: Client,
    api_key: String,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl HuggingFaceChat {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        if settings.hf_api_key.is_empty() {
            return Err(Error::Configuration(
                "Hugging Face chat requires HF_TOKEN or HUGGINGFACE_API_KEY".to_string(),
            ));
        }

        Ok(Self {
            client: build_client(settings.timeout_secs)?,
            api_key: settings.hf_api_key.clone(),
            url: format!(
                "{}/{}/v1/chat/completions",
                settings.hf_base_url.trim_end_matches('/'),
                settings.hf_provider
            ),
            model: settings.hf_model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    async fn perform_generation(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("Malformed {} chat response: {}", SERVICE, e)))?;

        let raw = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
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
impl TextGenerator for HuggingFaceChat {
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
struct FeatureRequest<'a> {
    inputs: &'a [String],
}

/// Sentence embeddings from the feature-extraction pipeline
pub struct HuggingFaceEmbedder {
    client: Client,
    api_key: String,
    url: String,
    model: String,
}

impl HuggingFaceEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        if settings.hf_api_key.is_empty() {
            return Err(Error::Configuration(
                "Hugging Face embeddings require HF_TOKEN or HUGGINGFACE_API_KEY".to_string(),
            ));
        }

        Ok(Self {
            client: build_client(settings.timeout_secs)?,
            api_key: settings.hf_api_key.clone(),
            url: format!(
                "{}/models/{}/pipeline/feature-extraction",
                settings.hf_base_url.trim_end_matches('/'),
                settings.hf_model
            ),
            model: settings.hf_model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::UpstreamUnavailable(format!("{} returned no embedding", SERVICE)))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&FeatureRequest { inputs: texts })
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("Malformed {} embedding response: {}", SERVICE, e)))?;

        let vectors = parse_feature_vectors(&body)?;
        if vectors.len() != texts.len() {
            return Err(Error::UpstreamUnavailable(format!(
                "{} returned {} embeddings for {} inputs",
                SERVICE,
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Read one vector per input from a feature-extraction payload.
///
/// Sentence-level models answer `[[f32]]`; token-level models answer
/// `[[[f32]]]`, which is mean-pooled per input.
pub(crate) fn parse_feature_vectors(body: &Value) -> Result<Vec<Vec<f32>>> {
    let malformed = || Error::UpstreamUnavailable(format!("Unexpected {} embedding payload shape", SERVICE));

    let items = body.as_array().ok_or_else(malformed)?;
    items
        .iter()
        .map(|item| {
            let rows = item.as_array().ok_or_else(malformed)?;
            match rows.first() {
                Some(Value::Array(_)) => {
                    let tokens: Vec<Vec<f32>> = rows
                        .iter()
                        .map(|row| as_floats(row).ok_or_else(malformed))
                        .collect::<Result<_>>()?;
                    mean_pool(&tokens).ok_or_else(malformed)
                }
                _ => as_floats(item).ok_or_else(malformed),
            }
        })
        .collect()
}

fn as_floats(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn mean_pool(tokens: &[Vec<f32>]) -> Option<Vec<f32>> {
    let width = tokens.first()?.len();
    let mut pooled = vec![0.0f32; width];
    for token in tokens {
        if token.len() != width {
            return None;
        }
        for (acc, v) in pooled.iter_mut().zip(token) {
            *acc += v;
        }
    }
    let count = tokens.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= count);
    Some(pooled)
}
