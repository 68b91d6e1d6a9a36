//! Fused context items and the character budget

use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};

use crate::core::{ChunkId, EntityId, SourceRef};
use crate::query::QueryAnalysis;

/// A partially fitting item is clipped only if at least this many characters remain
pub const MIN_CLIP_CHARS: usize = 80;

/// Which retrieval channel produced an item
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    /// Vector similarity search
    Vector,
    /// Knowledge graph traversal
    Graph,
}

/// Which channels contributed to a retrieved context
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Both graph facts and passages
    Hybrid,
    /// Graph facts only
    GraphOnly,
    /// Passages only
    VectorOnly,
    /// Nothing found
    Empty,
}

impl RetrievalMode {
    /// Mode implied by which channels returned anything
    pub fn from_channels(has_facts: bool, has_passages: bool) -> Self {
        match (has_facts, has_passages) {
            (true, true) => RetrievalMode::Hybrid,
            (true, false) => RetrievalMode::GraphOnly,
            (false, true) => RetrievalMode::VectorOnly,
            (false, false) => RetrievalMode::Empty,
        }
    }
}

/// One piece of fused context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextItem {
    /// A chunk returned by vector search
    Passage {
        /// Matching chunk
        chunk_id: ChunkId,
        /// Chunk text
        text: String,
        /// Cosine similarity clamped to [0, 1]
        score: f32,
        /// Document the chunk came from
        source_ref: SourceRef,
    },
    /// A statement derived from the knowledge graph
    Fact {
        /// Entity the fact was reached through
        entity_id: EntityId,
        /// Statement text
        text: String,
        /// Relation or match confidence
        score: f32,
    },
}

impl ContextItem {
    /// Item text
    pub fn text(&self) -> &str {
        match self {
            ContextItem::Passage { text, .. } | ContextItem::Fact { text, .. } => text,
        }
    }

    /// Source-specific score
    pub fn score(&self) -> f32 {
        match self {
            ContextItem::Passage { score, .. } | ContextItem::Fact { score, .. } => *score,
        }
    }

    /// Channel that produced the item
    pub fn source(&self) -> RetrievalSource {
        match self {
            ContextItem::Passage { .. } => RetrievalSource::Vector,
            ContextItem::Fact { .. } => RetrievalSource::Graph,
        }
    }

    fn clip(&mut self, max_chars: usize) {
        let text = match self {
            ContextItem::Passage { text, .. } | ContextItem::Fact { text, .. } => text,
        };
        if let Some((cut, _)) = text.char_indices().nth(max_chars) {
            text.truncate(cut);
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
        }
    }
}

/// Keep items in order while their rendered length fits `max_chars`.
///
/// Items are joined by one newline. The first item that does not fit is
/// clipped to the remaining budget when at least [`MIN_CLIP_CHARS`] remain,
/// and nothing after it is kept.
pub fn truncate_to_budget(items: Vec<ContextItem>, max_chars: usize) -> Vec<ContextItem> {
    let mut kept = Vec::new();
    let mut used = 0usize;

    for mut item in items {
        let separator = usize::from(!kept.is_empty());
        let len = item.text().chars().count();
        if used + separator + len <= max_chars {
            used += separator + len;
            kept.push(item);
            continue;
        }

        let remaining = max_chars.saturating_sub(used + separator);
        if remaining >= MIN_CLIP_CHARS {
            item.clip(remaining);
            kept.push(item);
        }
        break;
    }
    kept
}

/// Output of one retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    /// Fused items, best first, within the character budget
    pub items: Vec<ContextItem>,
    /// Entities the query was resolved to
    pub resolved_entities: Vec<EntityId>,
    /// Channels that contributed
    pub mode: RetrievalMode,
    /// Analysis of the query
    pub analysis: QueryAnalysis,
}

impl RetrievedContext {
    /// True when nothing relevant was found
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items joined by newlines, as handed to answer generation
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(ContextItem::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Graph facts only
    pub fn facts(&self) -> impl Iterator<Item = &ContextItem> {
        self.items.iter().filter(|i| i.source() == RetrievalSource::Graph)
    }

    /// Passages only
    pub fn passages(&self) -> impl Iterator<Item = &ContextItem> {
        self.items.iter().filter(|i| i.source() == RetrievalSource::Vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(text: &str) -> ContextItem {
        ContextItem::Fact {
            entity_id: EntityId::from("satellite:insat_3d"),
            text: text.to_string(),
            score: 1.0,
        }
    }

    #[test]
    fn everything_fits() {
        let items = vec![fact("abc"), fact("defg")];
        let kept = truncate_to_budget(items.clone(), 8);
        assert_eq!(kept, items);
    }

    #[test]
    fn stops_at_first_item_that_does_not_fit() {
        let items = vec![fact("abc"), fact("defghij"), fact("k")];
        // "abc" + "\n" leaves 4, below the clip minimum
        let kept = truncate_to_budget(items, 8);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text(), "abc");
    }

    #[test]
    fn long_remainder_is_clipped() {
        let long = "word ".repeat(60);
        let items = vec![fact("short fact"), fact(&long), fact("never reached")];
        let kept = truncate_to_budget(items, 100);
        assert_eq!(kept.len(), 2);
        assert!(kept[1].text().chars().count() <= 89);
        assert!(long.starts_with(kept[1].text()));
    }

    #[test]
    fn zero_budget_keeps_nothing() {
        assert!(truncate_to_budget(vec![fact("a")], 0).is_empty());
    }

    #[test]
    fn clipping_respects_char_boundaries() {
        let mut item = fact(&"é".repeat(100));
        item.clip(90);
        assert_eq!(item.text().chars().count(), 90);
    }

    #[test]
    fn modes_from_channels() {
        assert_eq!(RetrievalMode::from_channels(true, true), RetrievalMode::Hybrid);
        assert_eq!(RetrievalMode::from_channels(false, true), RetrievalMode::VectorOnly);
        assert_eq!(RetrievalMode::from_channels(true, false), RetrievalMode::GraphOnly);
        assert_eq!(RetrievalMode::from_channels(false, false), RetrievalMode::Empty);
        assert_eq!(RetrievalMode::GraphOnly.to_string(), "graph_only");
    }
}
