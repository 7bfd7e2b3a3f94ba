//! Deterministic local embeddings
//!
//! Hashes words and bigrams into a fixed number of buckets and normalizes
//! the result. No network and no model download, so it always works; the
//! quality is that of a bag-of-words sketch.

use async_trait::async_trait;

use wxr_core::{Embedder, Error, Result};

/// Hash-based embedder with a fixed output dimension
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimension: usize,
}

impl LocalEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Configuration(
                "LOCAL_EMBEDDINGS_DIM must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, token: &str) -> (usize, usize) {
        let digest = md5::compute(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.0[..8]);
        let hash = u64::from_le_bytes(bytes);
        (
            (hash as usize) % self.dimension,
            ((hash >> 16) as usize) % self.dimension,
        )
    }

    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let normalized_text = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect::<String>();

        let words: Vec<&str> = normalized_text.split_whitespace().collect();
        let mut embedding = vec![0.0f32; self.dimension];

        for (i, word) in words.iter().enumerate() {
            let (primary, secondary) = self.bucket(word);
            let weight = 1.0 / (1.0 + i as f32 * 0.1);
            embedding[primary] += weight;
            if word.len() > 3 {
                embedding[secondary] += weight * 0.5;
            }
        }

        for window in words.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            let (idx, _) = self.bucket(&bigram);
            embedding[idx] += 0.3;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }

        embedding
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate_embedding(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.generate_embedding(t)).collect())
    }

    async fn probe_dimension(&self) -> Result<usize> {
        Ok(self.dimension)
    }

    fn name(&self) -> &str {
        "local-hash"
    }
}
