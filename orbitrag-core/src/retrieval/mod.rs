//! Hybrid retrieval over the knowledge graph and the vector index.
//!
//! One retrieval runs both channels and fuses them:
//!
//! 1. the query is analyzed and its mentions resolved to graph entities
//!    (falling back to the previous turn's entities for follow-ups);
//! 2. each resolved entity contributes a profile fact plus one fact per
//!    relation reached within `max_hops`, carrying the reached entity's
//!    attributes;
//! 3. the query, prefixed by recent history, is embedded and searched;
//! 4. the fusion policy merges both lists and the result is cut to the
//!    character budget.
//!
//! No step is fatal. An unresolved name, a missing carried-over entity, an
//! embedding timeout or a dimension mismatch only removes that channel's
//! contribution; with nothing found the context is simply empty.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::config::{Config, RetrievalConfig};
use crate::core::{AnswerGenerator, AnswerRequest, Entity, EntityId, RelationKey, Result};
use crate::embeddings::{embed_with_timeout, EmbeddingProvider};
use crate::entity::Extractor;
use crate::graph::{Hop, KnowledgeGraph};
use crate::query::{ConversationContext, QueryAnalysis, QueryAnalyzer, Turn};
use crate::storage::KnowledgeReader;

pub mod context;
pub mod fusion;

pub use context::{
    truncate_to_budget, ContextItem, RetrievalMode, RetrievalSource, RetrievedContext,
    MIN_CLIP_CHARS,
};
pub use fusion::{policy_from_config, FusionPolicy, ReciprocalRank, ScoreMerge};

/// Profile score of an entity carried over from the previous turn
pub const CARRIED_ENTITY_SCORE: f32 = 0.75;

/// Reply used by [`HybridRetriever::answer`] when nothing was retrieved
pub const NO_INFORMATION_REPLY: &str =
    "I could not find information about that in the MOSDAC knowledge base. \
     Try naming a satellite, instrument or data product.";

/// Read-only hybrid retriever
pub struct HybridRetriever {
    knowledge: KnowledgeReader,
    embedder: Arc<dyn EmbeddingProvider>,
    analyzer: QueryAnalyzer,
    fusion: Box<dyn FusionPolicy>,
    retrieval: RetrievalConfig,
    max_hops: usize,
    top_k: usize,
    min_similarity: f32,
    embed_timeout: Duration,
}

impl HybridRetriever {
    /// Retriever with default configuration
    pub fn new(knowledge: KnowledgeReader, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Self::from_config(&Config::default(), knowledge, embedder)
    }

    /// Retriever configured from `config`
    pub fn from_config(
        config: &Config,
        knowledge: KnowledgeReader,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        Ok(Self {
            knowledge,
            embedder,
            analyzer: QueryAnalyzer::new(Extractor::from_config(&config.extraction)?)?,
            fusion: policy_from_config(&config.retrieval.fusion)?,
            retrieval: config.retrieval.clone(),
            max_hops: config.graph.max_hops,
            top_k: config.vector.top_k,
            min_similarity: config.vector.min_similarity,
            embed_timeout: config.embedding.timeout(),
        })
    }

    /// Replace the fusion policy
    pub fn with_fusion(mut self, fusion: Box<dyn FusionPolicy>) -> Self {
        self.fusion = fusion;
        self
    }

    /// The query analyzer
    pub fn analyzer(&self) -> &QueryAnalyzer {
        &self.analyzer
    }

    /// Gather and fuse context for `query`. Never fails.
    pub async fn retrieve(&self, query: &str, conversation: &ConversationContext) -> RetrievedContext {
        let analysis = self.analyzer.analyze(query);
        let (facts, resolved_entities) = self.graph_facts(&analysis, conversation);
        let passages = self.vector_passages(query, conversation).await;

        let mode = RetrievalMode::from_channels(!facts.is_empty(), !passages.is_empty());
        let (fact_count, passage_count) = (facts.len(), passages.len());
        let fused = self.fusion.fuse(passages, facts);
        let items = truncate_to_budget(fused, self.retrieval.max_context_chars);

        tracing::info!(
            mode = %mode,
            policy = self.fusion.name(),
            resolved = resolved_entities.len(),
            facts = fact_count,
            passages = passage_count,
            kept = items.len(),
            "retrieved context"
        );

        RetrievedContext {
            items,
            resolved_entities,
            mode,
            analysis,
        }
    }

    /// Retrieve, ask `generator` to phrase the answer, and record the turn.
    ///
    /// An empty context short-circuits to [`NO_INFORMATION_REPLY`]. Generator
    /// errors are returned and leave the conversation unchanged.
    pub async fn answer(
        &self,
        query: &str,
        conversation: &mut ConversationContext,
        generator: &dyn AnswerGenerator,
    ) -> Result<String> {
        let retrieved = self.retrieve(query, conversation).await;
        let reply = if retrieved.is_empty() {
            NO_INFORMATION_REPLY.to_string()
        } else {
            let request = AnswerRequest {
                query: query.to_string(),
                context: retrieved.render(),
                history: conversation.history_pairs(),
            };
            generator.generate(&request).await?
        };

        conversation.push(Turn {
            query: query.to_string(),
            context: retrieved.render(),
            resolved_entities: retrieved.resolved_entities,
        });
        Ok(reply)
    }

    fn graph_facts(
        &self,
        analysis: &QueryAnalysis,
        conversation: &ConversationContext,
    ) -> (Vec<ContextItem>, Vec<EntityId>) {
        let graph = self.knowledge.graph();

        let mut resolved: IndexMap<EntityId, f32> = IndexMap::new();
        for mention in &analysis.mentions {
            match graph.resolve(&mention.name, mention.entity_type) {
                Some((entity, score)) => {
                    let entry = resolved.entry(entity.id.clone()).or_insert(score);
                    *entry = entry.max(score);
                },
                None => tracing::debug!(mention = %mention.name, "mention not in graph"),
            }
        }
        if resolved.is_empty() && self.retrieval.carry_over_entities {
            for id in conversation.last_resolved_entities() {
                resolved.entry(id.clone()).or_insert(CARRIED_ENTITY_SCORE);
            }
            if !resolved.is_empty() {
                tracing::debug!(carried = resolved.len(), "reusing entities from previous turn");
            }
        }

        let resolved_ids: HashSet<&EntityId> = resolved.keys().collect();
        let mut profiles = Vec::new();
        let mut relation_facts: IndexMap<RelationKey, ContextItem> = IndexMap::new();
        let mut found = Vec::new();

        for (id, &match_score) in &resolved {
            let hops = match graph.traverse(id, self.max_hops, None) {
                Ok(hops) => hops,
                Err(e) => {
                    tracing::warn!(entity = %id, error = %e, "skipping entity");
                    continue;
                },
            };
            found.push(id.clone());
            if let Some(entity) = graph.get_entity(id) {
                profiles.push(ContextItem::Fact {
                    entity_id: id.clone(),
                    text: profile_text(entity),
                    score: match_score,
                });
            }

            for hop in hops {
                let direct = resolved_ids.contains(&hop.via.source_id) || resolved_ids.contains(&hop.via.target_id);
                let score = if direct { hop.via.confidence } else { hop.path_confidence };
                let key = hop.via.key();
                if relation_facts.get(&key).is_some_and(|existing| existing.score() >= score) {
                    continue;
                }
                let mut text = relation_text(&graph, &hop);
                // Resolved entities already describe themselves in their profile
                if !resolved_ids.contains(&hop.entity.id) {
                    if let Some(details) = attribute_details(&hop.entity) {
                        text.push_str(" - ");
                        text.push_str(&details);
                    }
                }
                relation_facts.insert(
                    key,
                    ContextItem::Fact {
                        entity_id: hop.entity.id,
                        text,
                        score,
                    },
                );
            }
        }

        let mut facts = profiles;
        facts.extend(relation_facts.into_values());
        // Stable: equal scores keep discovery order
        facts.sort_by(|a, b| b.score().total_cmp(&a.score()));
        (facts, found)
    }

    async fn vector_passages(&self, query: &str, conversation: &ConversationContext) -> Vec<ContextItem> {
        if self.knowledge.vectors().is_empty() {
            tracing::debug!("vector index empty, skipping similarity search");
            return Vec::new();
        }

        let mut parts = conversation.recent_queries(self.retrieval.history_turns);
        parts.push(query);
        let text = parts.join(" ");

        let embedding = match embed_with_timeout(self.embedder.as_ref(), &text, self.embed_timeout).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, continuing without passages");
                return Vec::new();
            },
        };

        let vectors = self.knowledge.vectors();
        let hits = match vectors.search(&embedding, self.top_k) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "similarity search failed, continuing without passages");
                return Vec::new();
            },
        };

        // Clamp before filtering: a negative cosine still counts as 0.0
        hits.into_iter()
            .map(|hit| (hit.score.clamp(0.0, 1.0), hit.chunk))
            .filter(|(score, _)| *score >= self.min_similarity)
            .map(|(score, chunk)| ContextItem::Passage {
                chunk_id: chunk.id,
                text: chunk.text,
                score,
                source_ref: chunk.source_ref,
            })
            .collect()
    }
}

fn profile_text(entity: &Entity) -> String {
    let mut text = format!("{} ({})", entity.name, entity.entity_type);
    if let Some(details) = attribute_details(entity) {
        text.push_str(" - ");
        text.push_str(&details);
    }
    text
}

/// `key: value` pairs joined by `; `, or `None` without attributes
fn attribute_details(entity: &Entity) -> Option<String> {
    if entity.attributes.is_empty() {
        return None;
    }
    let details: Vec<String> = entity
        .attributes
        .iter()
        .map(|(key, value)| format!("{}: {}", key.replace('_', " "), value))
        .collect();
    Some(details.join("; "))
}

fn relation_text(graph: &KnowledgeGraph, hop: &Hop) -> String {
    let name = |id: &EntityId| {
        graph
            .get_entity(id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    format!(
        "{} {} {}",
        name(&hop.via.source_id),
        hop.via.relation_type.replace('_', " "),
        name(&hop.via.target_id)
    )
}
