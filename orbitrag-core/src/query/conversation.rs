//! Bounded per-session conversation history

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::ConversationConfig;
use crate::core::EntityId;

/// Characters of each query shown in [`ConversationSummary::recent_topics`]
const TOPIC_PREVIEW_CHARS: usize = 50;

/// One answered query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// What the user asked
    pub query: String,
    /// Rendered context or answer kept for follow-ups
    pub context: String,
    /// Entities the retriever resolved for this query
    pub resolved_entities: Vec<EntityId>,
}

/// Short description of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Turns currently held
    pub total_turns: usize,
    /// Up to three most recent queries, oldest first, clipped
    pub recent_topics: Vec<String>,
    /// Characters across every held query and context
    pub total_chars: usize,
}

/// Sliding window over the latest turns of one session.
///
/// Pushing beyond the window drops the oldest turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    window: usize,
    turns: VecDeque<Turn>,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::from_config(&ConversationConfig::default())
    }
}

impl ConversationContext {
    /// Empty history holding at most `window` turns
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            turns: VecDeque::with_capacity(window),
        }
    }

    /// Empty history sized from configuration
    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new(config.window)
    }

    /// Record a turn
    pub fn push(&mut self, turn: Turn) {
        if self.turns.len() == self.window {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Turns held, oldest first
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Number of turns held
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True before the first turn
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forget every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The last `n` queries, oldest first
    pub fn recent_queries(&self, n: usize) -> Vec<&str> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).map(|t| t.query.as_str()).collect()
    }

    /// Entities resolved by the latest turn
    pub fn last_resolved_entities(&self) -> &[EntityId] {
        self.turns
            .back()
            .map(|t| t.resolved_entities.as_slice())
            .unwrap_or(&[])
    }

    /// `(query, context)` pairs, oldest first
    pub fn history_pairs(&self) -> Vec<(String, String)> {
        self.turns
            .iter()
            .map(|t| (t.query.clone(), t.context.clone()))
            .collect()
    }

    /// Turn count, recent topics and size
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            total_turns: self.turns.len(),
            recent_topics: self
                .recent_queries(3)
                .into_iter()
                .map(|q| q.chars().take(TOPIC_PREVIEW_CHARS).collect())
                .collect(),
            total_chars: self
                .turns
                .iter()
                .map(|t| t.query.chars().count() + t.context.chars().count())
                .sum(),
        }
    }
}
