use crate::config::{Config, FUSION_POLICIES};
use crate::core::{OrbitRagError, Result};

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the configuration is valid
    pub is_valid: bool,
    /// List of validation errors
    pub errors: Vec<String>,
    /// List of validation warnings
    pub warnings: Vec<String>,
    /// List of optimization suggestions
    pub suggestions: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

impl ValidationResult {
    /// Create a new validation result
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error and mark validation as failed
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
        self.is_valid = false;
    }

    /// Add a warning (doesn't affect validity)
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add an optimization suggestion
    pub fn add_suggestion(&mut self, suggestion: String) {
        self.suggestions.push(suggestion);
    }

    /// Convert into a `Validation` error listing every problem
    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            return Ok(());
        }
        Err(OrbitRagError::Validation {
            message: self.errors.join("; "),
        })
    }
}

/// Trait for configuration validation
pub trait Validatable {
    /// Validate configuration with standard checks
    fn validate(&self) -> ValidationResult;
}

fn check_unit_interval(result: &mut ValidationResult, name: &str, value: f32) {
    if !(0.0..=1.0).contains(&value) {
        result.add_error(format!("{name} must be between 0.0 and 1.0, got {value}"));
    }
}

impl Validatable for Config {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        let text = &self.text;
        if text.chunk_size == 0 {
            result.add_error("Chunk size must be greater than 0".to_string());
        } else if text.chunk_overlap >= text.chunk_size {
            result.add_error("Chunk overlap must be less than chunk size".to_string());
        } else if text.chunk_overlap > text.chunk_size / 2 {
            result.add_warning(
                "Chunk overlap is more than 50% of chunk size, this may be inefficient".to_string(),
            );
        }
        if text.chunk_size > 0 && text.min_chunk_chars > text.chunk_size {
            result.add_warning("Minimum chunk length exceeds chunk size, every chunk will be dropped".to_string());
        }

        check_unit_interval(&mut result, "Extraction min_confidence", self.extraction.min_confidence);
        check_unit_interval(&mut result, "Graph fuzzy_match_threshold", self.graph.fuzzy_match_threshold);
        if self.graph.max_hops == 0 {
            result.add_warning("max_hops is 0, graph facts will only describe resolved entities".to_string());
        } else if self.graph.max_hops > 4 {
            result.add_suggestion(
                "Traversals beyond 4 hops rarely add relevant facts; consider max_hops = 2".to_string(),
            );
        }

        if self.vector.dimension == 0 {
            result.add_error("Vector dimension must be greater than 0".to_string());
        }
        if self.vector.top_k == 0 {
            result.add_error("Top-k results must be greater than 0".to_string());
        } else if self.vector.top_k > 100 {
            result.add_warning("Top-k results is very high (>100), this may affect performance".to_string());
        }
        check_unit_interval(&mut result, "Vector min_similarity", self.vector.min_similarity);

        if self.embedding.timeout_ms == 0 {
            result.add_error("Embedding timeout must be greater than 0 ms".to_string());
        }
        if self.embedding.max_concurrency == 0 {
            result.add_error("Embedding max_concurrency must be greater than 0".to_string());
        }

        let fusion = &self.retrieval.fusion;
        if !FUSION_POLICIES.contains(&fusion.policy.as_str()) {
            result.add_error(format!(
                "Invalid fusion policy: '{}'. Must be one of {}",
                fusion.policy,
                FUSION_POLICIES.join(", ")
            ));
        }
        check_unit_interval(&mut result, "Fusion vector_weight", fusion.vector_weight);
        check_unit_interval(&mut result, "Fusion graph_weight", fusion.graph_weight);
        if fusion.vector_weight == 0.0 && fusion.graph_weight == 0.0 {
            result.add_error("Fusion weights cannot both be 0".to_string());
        }
        if fusion.rrf_k.is_nan() || fusion.rrf_k <= 0.0 {
            result.add_error("Fusion rrf_k must be positive".to_string());
        }
        if self.retrieval.max_context_chars == 0 {
            result.add_warning("max_context_chars is 0, every retrieved context will be empty".to_string());
        }

        if self.conversation.window == 0 {
            result.add_error("Conversation window must be greater than 0".to_string());
        } else if self.retrieval.history_turns > self.conversation.window {
            result.add_warning(format!(
                "history_turns ({}) exceeds the conversation window ({})",
                self.retrieval.history_turns, self.conversation.window
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let result = Config::default().validate();
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
        assert!(Config::default().validate().into_result().is_ok());
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut config = Config::default();
        config.text.chunk_overlap = config.text.chunk_size;
        config.vector.dimension = 0;
        config.vector.top_k = 0;
        config.graph.fuzzy_match_threshold = 1.5;
        config.conversation.window = 0;
        config.retrieval.fusion.policy = "weighted".to_string();

        let result = config.validate();
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 6);
        assert!(matches!(
            result.into_result(),
            Err(OrbitRagError::Validation { .. })
        ));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let mut config = Config::default();
        config.retrieval.fusion.vector_weight = 0.0;
        assert!(config.validate().is_valid);
        config.retrieval.fusion.graph_weight = 0.0;
        assert!(!config.validate().is_valid);
        config.retrieval.fusion.graph_weight = -0.5;
        assert!(!config.validate().is_valid);
    }

    #[test]
    fn warnings_do_not_invalidate() {
        let mut config = Config::default();
        config.retrieval.history_turns = 20;
        let result = config.validate();
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
