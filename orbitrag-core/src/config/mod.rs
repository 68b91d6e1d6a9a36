//! Typed configuration.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the keys
//! it overrides. Use [`Config::from_file`] to load TOML or JSON and
//! [`Validatable::validate`] before building components from it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Result;

pub mod loader;
pub mod validation;

pub use loader::ConfigFormat;
pub use validation::{Validatable, ValidationResult};

/// Fusion policy names accepted in `retrieval.fusion.policy`
pub const FUSION_POLICIES: &[&str] = &["score_merge", "rrf"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Normalization and chunking
    pub text: TextConfig,
    /// Entity and relation extraction
    pub extraction: ExtractionConfig,
    /// Knowledge graph lookup and traversal
    pub graph: GraphConfig,
    /// Vector index
    pub vector: VectorConfig,
    /// Embedding calls
    pub embedding: EmbeddingConfig,
    /// Hybrid retrieval
    pub retrieval: RetrievalConfig,
    /// Conversation history
    pub conversation: ConversationConfig,
}

impl Config {
    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        loader::load_config(path.as_ref())
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        loader::parse_config(content, ConfigFormat::Toml)
    }

    /// Parse JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        loader::parse_config(content, ConfigFormat::Json)
    }
}

/// Text section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Maximum chunk length in UTF-8 bytes
    pub chunk_size: usize,
    /// Bytes of trailing sentences repeated at the start of the next chunk
    pub chunk_overlap: usize,
    /// Chunks shorter than this after trimming are dropped
    pub min_chunk_chars: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            chunk_overlap: 150,
            min_chunk_chars: 20,
        }
    }
}

/// Extraction section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Candidates below this confidence are dropped
    pub min_confidence: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

/// Graph section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Minimum Levenshtein ratio for fuzzy name lookup
    pub fuzzy_match_threshold: f32,
    /// Traversal depth used by the retriever
    pub max_hops: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            fuzzy_match_threshold: crate::graph::DEFAULT_FUZZY_THRESHOLD,
            max_hops: 2,
        }
    }
}

/// Vector section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Embedding dimension
    pub dimension: usize,
    /// Hits requested per query
    pub top_k: usize,
    /// Hits below this similarity are discarded
    pub min_similarity: f32,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: 256,
            top_k: 5,
            min_similarity: 0.0,
        }
    }
}

/// Embedding section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
    /// Concurrent embedding calls during ingestion
    pub max_concurrency: usize,
}

impl EmbeddingConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_concurrency: 4,
        }
    }
}

/// Retrieval section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Character budget of the fused context
    pub max_context_chars: usize,
    /// Prior queries folded into the query embedding
    pub history_turns: usize,
    /// Reuse the previous turn's entities when the query names none
    pub carry_over_entities: bool,
    /// How graph facts and vector hits are merged
    pub fusion: FusionConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 4000,
            history_turns: 2,
            carry_over_entities: true,
            fusion: FusionConfig::default(),
        }
    }
}

/// Fusion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// `score_merge` or `rrf`
    pub policy: String,
    /// Weight applied to vector similarity
    pub vector_weight: f32,
    /// Weight applied to fact confidence
    pub graph_weight: f32,
    /// Reciprocal-rank constant
    pub rrf_k: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            policy: "score_merge".to_string(),
            vector_weight: 1.0,
            graph_weight: 1.0,
            rrf_k: 60.0,
        }
    }
}

/// Conversation section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Turns kept before the oldest is dropped
    pub window: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { window: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.text.chunk_size, 1200);
        assert_eq!(config.graph.max_hops, 2);
        assert_eq!(config.retrieval.fusion.policy, "score_merge");
        assert_eq!(config.conversation.window, 10);
        assert!(config.validate().is_valid);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [vector]
            dimension = 64

            [retrieval.fusion]
            policy = "rrf"
            "#,
        )
        .unwrap();
        assert_eq!(config.vector.dimension, 64);
        assert_eq!(config.vector.top_k, 5);
        assert_eq!(config.retrieval.fusion.policy, "rrf");
        assert_eq!(config.retrieval.max_context_chars, 4000);
    }

    #[test]
    fn json_round_trip() {
        let mut config = Config::default();
        config.graph.max_hops = 3;
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(Config::from_json_str(&json).unwrap(), config);
    }
}
