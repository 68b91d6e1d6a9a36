//! Contracts with the collaborators that sit outside the retrieval core

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Everything the answer-generation service receives for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// The user's question
    pub query: String,
    /// Rendered fused context
    pub context: String,
    /// Prior (query, context) pairs, oldest first
    pub history: Vec<(String, String)>,
}

/// Phrases the final natural-language answer.
///
/// The core never implements this; callers plug in a hosted model client.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Produce free-form answer text
    async fn generate(&self, request: &AnswerRequest) -> Result<String>;

    /// Name used in logs
    fn generator_name(&self) -> &str;
}
