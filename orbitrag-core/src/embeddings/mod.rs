//! Embedding providers.
//!
//! The retrieval core only requires that a provider returns vectors of one
//! fixed length. [`HashingEmbedder`] is a deterministic offline provider: each
//! lowercased token maps to a SHA-256 derived vector and a text embeds as the
//! normalized mean of its token vectors, so texts that share vocabulary score
//! higher than texts that don't.

use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::core::{OrbitRagError, Result};
use crate::text::tokens;
use crate::vector::VectorUtils;

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the embedding dimension
    fn dimensions(&self) -> usize;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// Embed `text`, failing with `Timeout` if the provider takes longer than `timeout`
pub async fn embed_with_timeout(
    provider: &dyn EmbeddingProvider,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>> {
    match tokio::time::timeout(timeout, provider.embed(text)).await {
        Ok(result) => result,
        Err(_) => Err(OrbitRagError::Timeout {
            operation: format!("{} embed", provider.provider_name()),
            duration: timeout,
        }),
    }
}

/// Deterministic bag-of-tokens embedder backed by SHA-256
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimension` components
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous embedding; the async trait methods delegate here
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dimension];
        let mut count = 0usize;
        for token in tokens(text) {
            let token_vector = self.token_vector(&token.text.to_lowercase());
            for (total, value) in sum.iter_mut().zip(&token_vector) {
                *total += value;
            }
            count += 1;
        }
        if count == 0 {
            return sum;
        }
        VectorUtils::normalize(&mut sum);
        sum
    }

    fn token_vector(&self, token: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimension);
        let mut counter: u32 = 0;

        while vector.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(token.as_bytes());
            hasher.update(counter.to_le_bytes());
            let hash = hasher.finalize();

            for byte in hash.iter() {
                if vector.len() >= self.dimension {
                    break;
                }
                // Map byte [0,255] to [-1.0, 1.0]
                vector.push((*byte as f32 / 127.5) - 1.0);
            }
            counter += 1;
        }

        VectorUtils::normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }
}
