//! Pluggable fusion policies for hybrid retrieval ranking.
//!
//! Both inputs arrive sorted best first: passages by similarity, facts by
//! confidence. Policies interleave them into one list and never drop items;
//! the character budget is applied afterwards.

use crate::config::FusionConfig;
use crate::core::{OrbitRagError, Result};

use super::context::ContextItem;

/// Strategy for merging ranked passages and facts
pub trait FusionPolicy: Send + Sync {
    /// Merge two best-first lists into one best-first list
    fn fuse(&self, passages: Vec<ContextItem>, facts: Vec<ContextItem>) -> Vec<ContextItem>;
    /// Stable policy identifier
    fn name(&self) -> &str;
}

/// Weighted-score merge.
///
/// Each item is ranked by `weight * score` of its channel. On equal weighted
/// scores the passage comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMerge {
    /// Weight for passage similarity
    pub vector_weight: f32,
    /// Weight for fact confidence
    pub graph_weight: f32,
}

impl Default for ScoreMerge {
    fn default() -> Self {
        Self {
            vector_weight: 1.0,
            graph_weight: 1.0,
        }
    }
}

impl FusionPolicy for ScoreMerge {
    fn fuse(&self, passages: Vec<ContextItem>, facts: Vec<ContextItem>) -> Vec<ContextItem> {
        let mut fused = Vec::with_capacity(passages.len() + facts.len());
        let mut passages = passages.into_iter().peekable();
        let mut facts = facts.into_iter().peekable();

        loop {
            let take_passage = match (passages.peek(), facts.peek()) {
                (Some(p), Some(f)) => self.vector_weight * p.score() >= self.graph_weight * f.score(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_passage { passages.next() } else { facts.next() };
            fused.extend(next);
        }
        fused
    }

    fn name(&self) -> &str {
        "score_merge"
    }
}

/// Reciprocal Rank Fusion.
///
/// An item at 0-based rank `r` in its list scores `1 / (k + r + 1)`, so the
/// lists interleave by rank regardless of raw score scale. Equal ranks put
/// the passage first.
#[derive(Debug, Clone, PartialEq)]
pub struct ReciprocalRank {
    /// RRF constant (higher values flatten rank contributions)
    pub k: f32,
}

impl Default for ReciprocalRank {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

impl FusionPolicy for ReciprocalRank {
    fn fuse(&self, passages: Vec<ContextItem>, facts: Vec<ContextItem>) -> Vec<ContextItem> {
        let rrf = |rank: usize| 1.0 / (self.k + rank as f32 + 1.0);
        let mut scored: Vec<(f32, ContextItem)> = passages
            .into_iter()
            .enumerate()
            .map(|(rank, item)| (rrf(rank), item))
            .chain(facts.into_iter().enumerate().map(|(rank, item)| (rrf(rank), item)))
            .collect();
        // Stable: passages were chained first
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().map(|(_, item)| item).collect()
    }

    fn name(&self) -> &str {
        "rrf"
    }
}

/// Build the policy named in `config.policy`
pub fn policy_from_config(config: &FusionConfig) -> Result<Box<dyn FusionPolicy>> {
    match config.policy.as_str() {
        "score_merge" => Ok(Box::new(ScoreMerge {
            vector_weight: config.vector_weight,
            graph_weight: config.graph_weight,
        })),
        "rrf" => Ok(Box::new(ReciprocalRank { k: config.rrf_k })),
        other => Err(OrbitRagError::Config {
            message: format!("unknown fusion policy '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChunkId, EntityId, SourceRef};

    fn passage(id: &str, score: f32) -> ContextItem {
        ContextItem::Passage {
            chunk_id: ChunkId::from(id),
            text: id.to_string(),
            score,
            source_ref: SourceRef::new("doc"),
        }
    }

    fn fact(text: &str, score: f32) -> ContextItem {
        ContextItem::Fact {
            entity_id: EntityId::from("satellite:insat_3d"),
            text: text.to_string(),
            score,
        }
    }

    fn texts(items: &[ContextItem]) -> Vec<&str> {
        items.iter().map(ContextItem::text).collect()
    }

    #[test]
    fn score_merge_interleaves_by_score() {
        let fused = ScoreMerge::default().fuse(
            vec![passage("p1", 0.8), passage("p2", 0.3)],
            vec![fact("f1", 0.9), fact("f2", 0.5)],
        );
        assert_eq!(texts(&fused), vec!["f1", "p1", "f2", "p2"]);
    }

    #[test]
    fn score_merge_ties_prefer_passages() {
        let fused = ScoreMerge::default().fuse(vec![passage("p", 0.7)], vec![fact("f", 0.7)]);
        assert_eq!(texts(&fused), vec!["p", "f"]);
    }

    #[test]
    fn weights_shift_the_balance() {
        let graph_heavy = ScoreMerge {
            vector_weight: 0.5,
            graph_weight: 1.0,
        };
        let fused = graph_heavy.fuse(vec![passage("p", 0.9)], vec![fact("f", 0.5)]);
        assert_eq!(texts(&fused), vec!["f", "p"]);
    }

    #[test]
    fn one_sided_inputs_pass_through() {
        let fused = ScoreMerge::default().fuse(vec![], vec![fact("f1", 0.9), fact("f2", 0.1)]);
        assert_eq!(texts(&fused), vec!["f1", "f2"]);
        assert!(ScoreMerge::default().fuse(vec![], vec![]).is_empty());
    }

    #[test]
    fn rrf_alternates_by_rank() {
        let fused = ReciprocalRank::default().fuse(
            vec![passage("p1", 0.99), passage("p2", 0.98), passage("p3", 0.97)],
            vec![fact("f1", 0.2)],
        );
        assert_eq!(texts(&fused), vec!["p1", "f1", "p2", "p3"]);
    }

    #[test]
    fn policies_from_config() {
        let mut config = FusionConfig::default();
        assert_eq!(policy_from_config(&config).unwrap().name(), "score_merge");
        config.policy = "rrf".to_string();
        assert_eq!(policy_from_config(&config).unwrap().name(), "rrf");
        config.policy = "borda".to_string();
        assert!(policy_from_config(&config).is_err());
    }
}
