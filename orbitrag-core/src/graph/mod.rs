//! Knowledge graph store.
//!
//! Entities and relations live in a directed `petgraph` graph. Side indexes map
//! entity ids to nodes, identity keys to ids and relation keys to edges, so
//! every upsert is a lookup followed by an in-place merge.
//!
//! Merges are commutative and idempotent: source refs and attributes are set
//! unions (conflicting attribute values keep the lexicographically smaller
//! value), relation confidence only ever rises to the max seen.

/// Edit-distance name matching
pub mod name_match;
/// Curated base catalogue
pub mod seed;
/// Breadth-first neighbourhood traversal
pub mod traversal;

use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Direction, Graph};
use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::core::{
    clamp_confidence, merge_attributes, Entity, EntityCandidate, EntityId, EntityType,
    OrbitRagError, Relation, RelationCandidate, RelationKey, Result,
};
use crate::entity::ExtractionOutput;
use crate::text::normalize_key;

pub use name_match::{levenshtein_distance, similarity_ratio};
pub use traversal::Hop;

/// Default fuzzy lookup threshold (edit-distance ratio)
pub const DEFAULT_FUZZY_THRESHOLD: f32 = 0.85;

/// Deduplicated entity and relation store
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    graph: Graph<Entity, Relation>,
    entity_index: HashMap<EntityId, NodeIndex>,
    name_index: HashMap<String, Vec<EntityId>>,
    relation_index: HashMap<RelationKey, EdgeIndex>,
    fuzzy_threshold: f32,
}

/// Counts produced by merging one extraction output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entity upserts applied
    pub entities: usize,
    /// Relation upserts applied
    pub relations: usize,
}

/// An entity adjacent to another, seen from that other entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedEntity {
    /// Related entity id
    pub id: EntityId,
    /// Related entity name
    pub name: String,
    /// Related entity type
    pub entity_type: EntityType,
    /// Relation label; incoming edges are labelled `inverse_<type>`
    pub relation_type: String,
    /// Relation confidence
    pub confidence: f32,
}

/// An entity together with everything directly related to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    /// The entity
    pub entity: Entity,
    /// Direct neighbours, ordered by relation label then id
    pub related: Vec<RelatedEntity>,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeGraph {
    /// Create a new empty knowledge graph
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            entity_index: HashMap::new(),
            name_index: HashMap::new(),
            relation_index: HashMap::new(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    /// Create an empty graph using the configured lookup threshold
    pub fn from_config(config: &GraphConfig) -> Self {
        Self::new().with_fuzzy_threshold(config.fuzzy_match_threshold)
    }

    /// Set the minimum edit-distance ratio accepted by fuzzy lookup
    pub fn with_fuzzy_threshold(mut self, threshold: f32) -> Self {
        self.set_fuzzy_threshold(threshold);
        self
    }

    /// Change the fuzzy lookup threshold in place
    pub fn set_fuzzy_threshold(&mut self, threshold: f32) {
        self.fuzzy_threshold = clamp_confidence(threshold);
    }

    /// Minimum edit-distance ratio accepted by fuzzy lookup
    pub fn fuzzy_threshold(&self) -> f32 {
        self.fuzzy_threshold
    }

    /// Merge a candidate by identity key and return its id. Always succeeds.
    pub fn upsert_entity(&mut self, candidate: &EntityCandidate) -> EntityId {
        self.merge_entity(Entity::from(candidate))
    }

    /// Merge a full entity record by id
    pub fn merge_entity(&mut self, incoming: Entity) -> EntityId {
        if let Some(&node) = self.entity_index.get(&incoming.id) {
            let entity = &mut self.graph[node];
            merge_attributes(&mut entity.attributes, &incoming.attributes);
            entity.source_refs.extend(incoming.source_refs);
            if incoming.name < entity.name {
                entity.name = incoming.name;
            }
            return entity.id.clone();
        }

        let id = incoming.id.clone();
        let ids = self.name_index.entry(incoming.key()).or_default();
        if let Err(pos) = ids.binary_search(&id) {
            ids.insert(pos, id.clone());
        }
        let node = self.graph.add_node(incoming);
        self.entity_index.insert(id.clone(), node);
        id
    }

    /// Merge a relation candidate, upserting both endpoints first.
    ///
    /// Confidence becomes `max(existing, new)`; it never decreases.
    pub fn upsert_relation(&mut self, candidate: &RelationCandidate) -> RelationKey {
        let source_id = self.upsert_entity(&candidate.source);
        let target_id = self.upsert_entity(&candidate.target);
        let relation = Relation {
            source_id,
            target_id,
            relation_type: candidate.relation_type.clone(),
            confidence: candidate.confidence,
            source_refs: [candidate.source_ref.clone()].into_iter().collect(),
        };
        let key = relation.key();
        self.attach_relation(relation);
        key
    }

    /// Merge a full relation record whose endpoints already exist
    pub fn merge_relation(&mut self, relation: Relation) -> Result<RelationKey> {
        for id in [&relation.source_id, &relation.target_id] {
            if !self.entity_index.contains_key(id) {
                return Err(OrbitRagError::entity_not_found(id.as_str()));
            }
        }
        let key = relation.key();
        self.attach_relation(relation);
        Ok(key)
    }

    fn attach_relation(&mut self, mut relation: Relation) {
        relation.confidence = clamp_confidence(relation.confidence);
        let key = relation.key();
        if let Some(&edge) = self.relation_index.get(&key) {
            let existing = &mut self.graph[edge];
            existing.confidence = existing.confidence.max(relation.confidence);
            existing.source_refs.extend(relation.source_refs);
            return;
        }

        // Endpoints are guaranteed present by both callers
        let (Some(&source), Some(&target)) = (
            self.entity_index.get(&relation.source_id),
            self.entity_index.get(&relation.target_id),
        ) else {
            return;
        };
        let edge = self.graph.add_edge(source, target, relation);
        self.relation_index.insert(key, edge);
    }

    /// Merge every candidate of an extraction output
    pub fn merge_extraction(&mut self, output: &ExtractionOutput) -> MergeStats {
        for entity in &output.entities {
            self.upsert_entity(entity);
        }
        for relation in &output.relations {
            self.upsert_relation(relation);
        }
        MergeStats {
            entities: output.entities.len(),
            relations: output.relations.len(),
        }
    }

    /// Get an entity by id
    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entity_index.get(id).map(|&node| &self.graph[node])
    }

    /// Whether an entity with this id exists
    pub fn contains_entity(&self, id: &EntityId) -> bool {
        self.entity_index.contains_key(id)
    }

    /// Get a relation by its identity key
    pub fn get_relation(&self, key: &RelationKey) -> Option<&Relation> {
        self.relation_index.get(key).map(|&edge| &self.graph[edge])
    }

    /// All entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.graph.node_weights()
    }

    /// All relations in insertion order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.graph.edge_weights()
    }

    /// Number of entities
    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of relations
    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True when the graph holds no entities
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Relations in either direction between two entities
    pub fn relations_between(&self, a: &EntityId, b: &EntityId) -> Vec<&Relation> {
        let (Some(&na), Some(&nb)) = (self.entity_index.get(a), self.entity_index.get(b)) else {
            return Vec::new();
        };
        let mut found: Vec<&Relation> = self
            .graph
            .edges_connecting(na, nb)
            .chain(self.graph.edges_connecting(nb, na))
            .map(|edge| edge.weight())
            .collect();
        found.sort_by(|x, y| x.key().cmp(&y.key()));
        found.dedup_by(|x, y| x.key() == y.key());
        found
    }

    /// Entity with its direct neighbours. Fails with `NotFound` for unknown ids.
    pub fn entity_info(&self, id: &EntityId) -> Result<EntityInfo> {
        let node = self.node(id)?;
        let mut related: Vec<RelatedEntity> = Vec::new();

        for edge in self.graph.edges_directed(node, Direction::Outgoing) {
            let other = &self.graph[edge.target()];
            related.push(RelatedEntity {
                id: other.id.clone(),
                name: other.name.clone(),
                entity_type: other.entity_type,
                relation_type: edge.weight().relation_type.clone(),
                confidence: edge.weight().confidence,
            });
        }
        for edge in self.graph.edges_directed(node, Direction::Incoming) {
            let other = &self.graph[edge.source()];
            related.push(RelatedEntity {
                id: other.id.clone(),
                name: other.name.clone(),
                entity_type: other.entity_type,
                relation_type: format!("inverse_{}", edge.weight().relation_type),
                confidence: edge.weight().confidence,
            });
        }
        related.sort_by(|a, b| a.relation_type.cmp(&b.relation_type).then(a.id.cmp(&b.id)));

        Ok(EntityInfo {
            entity: self.graph[node].clone(),
            related,
        })
    }

    /// Exact, then fuzzy, canonical-name lookup.
    ///
    /// Returns `None` rather than guessing when no name reaches the threshold.
    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        self.find_by_name_scored(name).map(|(entity, _)| entity)
    }

    /// Like [`find_by_name`](Self::find_by_name), also returning the match score
    pub fn find_by_name_scored(&self, name: &str) -> Option<(&Entity, f32)> {
        let key = normalize_key(name);
        if key.is_empty() {
            return None;
        }

        if let Some(ids) = self.name_index.get(&key) {
            let best = ids
                .iter()
                .filter_map(|id| self.get_entity(id))
                .min_by(|a, b| type_rank(a.entity_type).cmp(&type_rank(b.entity_type)).then(a.id.cmp(&b.id)));
            if let Some(entity) = best {
                return Some((entity, 1.0));
            }
        }

        let mut best: Option<(&Entity, f32)> = None;
        for (candidate_key, ids) in &self.name_index {
            let score = similarity_ratio(&key, candidate_key);
            if score < self.fuzzy_threshold {
                continue;
            }
            for entity in ids.iter().filter_map(|id| self.get_entity(id)) {
                let better = match best {
                    None => true,
                    Some((current, current_score)) => {
                        score > current_score
                            || (score == current_score
                                && (type_rank(entity.entity_type), &entity.id)
                                    < (type_rank(current.entity_type), &current.id))
                    },
                };
                if better {
                    best = Some((entity, score));
                }
            }
        }
        best
    }

    /// Resolve a typed mention: exact id first, then name lookup
    pub fn resolve(&self, name: &str, entity_type: EntityType) -> Option<(&Entity, f32)> {
        self.get_entity(&EntityId::for_entity(name, entity_type))
            .map(|entity| (entity, 1.0))
            .or_else(|| self.find_by_name_scored(name))
    }

    pub(crate) fn node(&self, id: &EntityId) -> Result<NodeIndex> {
        self.entity_index
            .get(id)
            .copied()
            .ok_or_else(|| OrbitRagError::entity_not_found(id.as_str()))
    }

    pub(crate) fn graph(&self) -> &Graph<Entity, Relation> {
        &self.graph
    }
}

fn type_rank(entity_type: EntityType) -> usize {
    EntityType::ALL
        .iter()
        .position(|t| *t == entity_type)
        .unwrap_or(EntityType::ALL.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceRef;

    fn candidate(name: &str, entity_type: EntityType, source: &str) -> EntityCandidate {
        EntityCandidate::new(name, entity_type, SourceRef::new(source))
    }

    fn relation(
        source: (&str, EntityType),
        relation_type: &str,
        target: (&str, EntityType),
        confidence: f32,
        doc: &str,
    ) -> RelationCandidate {
        RelationCandidate::new(
            candidate(source.0, source.1, doc),
            candidate(target.0, target.1, doc),
            relation_type,
            confidence,
            SourceRef::new(doc),
        )
    }

    #[test]
    fn same_key_and_type_merge_into_one_entity() {
        let mut graph = KnowledgeGraph::new();
        let a = graph.upsert_entity(&candidate("INSAT-3D", EntityType::Satellite, "doc-a"));
        let b = graph.upsert_entity(
            &candidate("insat 3d", EntityType::Satellite, "doc-b").with_attribute("orbit", "geostationary"),
        );

        assert_eq!(a, b);
        assert_eq!(graph.entity_count(), 1);
        let entity = graph.get_entity(&a).unwrap();
        assert_eq!(entity.name, "INSAT-3D");
        assert_eq!(entity.source_refs.len(), 2);
        assert_eq!(entity.attributes.get("orbit").map(String::as_str), Some("geostationary"));
    }

    #[test]
    fn same_name_different_type_stays_separate() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_entity(&candidate("SARAL", EntityType::Satellite, "d"));
        graph.upsert_entity(&candidate("SARAL", EntityType::Mission, "d"));
        assert_eq!(graph.entity_count(), 2);
        // Exact lookup prefers satellites
        assert_eq!(graph.find_by_name("saral").unwrap().entity_type, EntityType::Satellite);
    }

    #[test]
    fn conflicting_attributes_resolve_independent_of_order() {
        let mut forward = KnowledgeGraph::new();
        forward.upsert_entity(&candidate("RISAT-1", EntityType::Satellite, "a").with_attribute("launch_year", "2012"));
        forward.upsert_entity(&candidate("RISAT-1", EntityType::Satellite, "b").with_attribute("launch_year", "2011"));

        let mut backward = KnowledgeGraph::new();
        backward.upsert_entity(&candidate("RISAT-1", EntityType::Satellite, "b").with_attribute("launch_year", "2011"));
        backward.upsert_entity(&candidate("RISAT-1", EntityType::Satellite, "a").with_attribute("launch_year", "2012"));

        let id = EntityId::for_entity("RISAT-1", EntityType::Satellite);
        assert_eq!(forward.get_entity(&id), backward.get_entity(&id));
        assert_eq!(
            forward.get_entity(&id).unwrap().attributes["launch_year"],
            "2011"
        );
    }

    #[test]
    fn relation_confidence_takes_the_max() {
        let mut graph = KnowledgeGraph::new();
        let sat = ("SCATSAT-1", EntityType::Satellite);
        let inst = ("OSCAT", EntityType::Instrument);
        let key = graph.upsert_relation(&relation(sat, "carries", inst, 0.7, "doc-a"));
        graph.upsert_relation(&relation(sat, "carries", inst, 0.9, "doc-b"));
        graph.upsert_relation(&relation(sat, "carries", inst, 0.4, "doc-c"));

        assert_eq!(graph.relation_count(), 1);
        let stored = graph.get_relation(&key).unwrap();
        assert_eq!(stored.confidence, 0.9);
        assert_eq!(stored.source_refs.len(), 3);
    }

    #[test]
    fn merge_relation_requires_endpoints() {
        let mut graph = KnowledgeGraph::new();
        let err = graph
            .merge_relation(Relation {
                source_id: EntityId::from("satellite:ghost"),
                target_id: EntityId::from("instrument:ghost"),
                relation_type: "carries".to_string(),
                confidence: 0.5,
                source_refs: Default::default(),
            })
            .unwrap_err();
        assert!(matches!(err, OrbitRagError::NotFound { .. }));
    }

    #[test]
    fn fuzzy_lookup_respects_threshold() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_entity(&candidate("RESOURCESAT-2", EntityType::Satellite, "d"));

        let (entity, score) = graph.find_by_name_scored("Resorcesat-2").unwrap();
        assert_eq!(entity.name, "RESOURCESAT-2");
        assert!(score >= DEFAULT_FUZZY_THRESHOLD && score < 1.0);

        assert!(graph.find_by_name("Cartosat").is_none());
        assert!(graph.find_by_name("").is_none());

        let strict = graph.clone().with_fuzzy_threshold(0.99);
        assert!(strict.find_by_name("Resorcesat-2").is_none());
        assert!(strict.find_by_name("resourcesat 2").is_some());
    }

    #[test]
    fn entity_info_labels_incoming_relations() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_relation(&relation(
            ("ISRO", EntityType::Organization),
            "operates",
            ("MOSDAC", EntityType::Organization),
            0.9,
            "d",
        ));
        let mosdac = EntityId::for_entity("MOSDAC", EntityType::Organization);
        let info = graph.entity_info(&mosdac).unwrap();
        assert_eq!(info.related.len(), 1);
        assert_eq!(info.related[0].relation_type, "inverse_operates");
        assert_eq!(info.related[0].name, "ISRO");

        assert!(graph.entity_info(&EntityId::from("organization:nasa")).is_err());
    }

    #[test]
    fn relations_between_sees_both_directions() {
        let mut graph = KnowledgeGraph::new();
        let isro = ("ISRO", EntityType::Organization);
        let mosdac = ("MOSDAC", EntityType::Organization);
        graph.upsert_relation(&relation(isro, "operates", mosdac, 0.9, "d"));
        graph.upsert_relation(&relation(mosdac, "operated_by", isro, 0.85, "d"));

        let a = EntityId::for_entity("ISRO", EntityType::Organization);
        let b = EntityId::for_entity("MOSDAC", EntityType::Organization);
        assert_eq!(graph.relations_between(&a, &b).len(), 2);
        assert_eq!(graph.relations_between(&b, &a).len(), 2);
    }
}
