//! Core data structures and abstractions
//!
//! This module contains the identifiers, domain types and error handling
//! shared by every component of the retrieval core.

pub mod error;
pub mod traits;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display as StrumDisplay, EnumString};

use crate::text::normalize_key;

// Re-export key items for convenience
pub use error::{ErrorContext, ErrorSeverity, OrbitRagError, Result};
pub use traits::{AnswerGenerator, AnswerRequest};

/// Unique identifier for entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    /// Creates a new EntityId from a string
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Derives the id an entity with this name and type always receives.
    ///
    /// The id depends only on the identity key, so two stores fed the same
    /// mentions in any order agree on every id.
    pub fn for_entity(name: &str, entity_type: EntityType) -> Self {
        Self(format!("{entity_type}:{}", normalize_key(name).replace(' ', "_")))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Unique identifier for text chunks
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(pub String);

impl ChunkId {
    /// Creates a new ChunkId from a string
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Chunk ids are the leading part of the content hash
    pub fn from_content_hash(hash: &str) -> Self {
        Self(format!("chunk_{}", &hash[..hash.len().min(16)]))
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChunkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChunkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of the document a piece of text came from (a page URL, a file path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRef(pub String);

impl SourceRef {
    /// Creates a new SourceRef
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of domain object an entity denotes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// An earth observation or communication satellite
    Satellite,
    /// A named mission or programme
    Mission,
    /// A geophysical data product (SST, chlorophyll, ...)
    DataProduct,
    /// A sensor or payload carried by a satellite
    Instrument,
    /// An agency, centre or data portal
    Organization,
    /// A file format or data access protocol
    Format,
    /// Anything else the rules bind, such as portal services
    Other,
}

impl EntityType {
    /// All entity types, in resolution preference order
    pub const ALL: [EntityType; 7] = [
        EntityType::Satellite,
        EntityType::Mission,
        EntityType::Instrument,
        EntityType::DataProduct,
        EntityType::Organization,
        EntityType::Format,
        EntityType::Other,
    ];
}

/// A deduplicated domain object held by the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier derived from the identity key
    pub id: EntityId,
    /// Canonical display form of the name
    pub name: String,
    /// Kind of object
    pub entity_type: EntityType,
    /// Free-form facts (launch year, orbit, description)
    pub attributes: BTreeMap<String, String>,
    /// Documents this entity was extracted from
    pub source_refs: BTreeSet<SourceRef>,
}

impl Entity {
    /// Normalized identity key: two mentions with the same key and type are one entity
    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }
}

impl From<&EntityCandidate> for Entity {
    fn from(candidate: &EntityCandidate) -> Self {
        Self {
            id: candidate.entity_id(),
            name: candidate.name.clone(),
            entity_type: candidate.entity_type,
            attributes: candidate.attributes.clone(),
            source_refs: BTreeSet::from([candidate.source_ref.clone()]),
        }
    }
}

/// Uniqueness key of a relation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationKey {
    /// Source entity
    pub source_id: EntityId,
    /// Target entity
    pub target_id: EntityId,
    /// Relation label
    pub relation_type: String,
}

/// A typed, confidence-scored directed edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Source entity ID for the relation
    pub source_id: EntityId,
    /// Target entity ID for the relation
    pub target_id: EntityId,
    /// Relation label (e.g., "carries", "operated_by")
    pub relation_type: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Documents the relation was extracted from
    pub source_refs: BTreeSet<SourceRef>,
}

impl Relation {
    /// Uniqueness key of this relation
    pub fn key(&self) -> RelationKey {
        RelationKey {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            relation_type: self.relation_type.clone(),
        }
    }
}

/// A unit of ingested text together with its embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier
    pub id: ChunkId,
    /// Chunk text
    pub text: String,
    /// Embedding vector; its length must match the index dimension
    pub embedding: Vec<f32>,
    /// Document the chunk came from
    pub source_ref: SourceRef,
    /// Entities mentioned in the chunk
    pub entity_ids: BTreeSet<EntityId>,
    /// SHA-256 of the chunk text, hex encoded
    pub content_hash: String,
}

impl Chunk {
    /// Build a chunk whose id is derived from the hash of its text
    pub fn new(text: impl Into<String>, embedding: Vec<f32>, source_ref: SourceRef) -> Self {
        let text = text.into();
        let content_hash = content_hash(&text);
        Self {
            id: ChunkId::from_content_hash(&content_hash),
            text,
            embedding,
            source_ref,
            entity_ids: BTreeSet::new(),
            content_hash,
        }
    }

    /// Build a chunk with an explicit id
    pub fn with_id(
        id: impl Into<ChunkId>,
        text: impl Into<String>,
        embedding: Vec<f32>,
        source_ref: SourceRef,
    ) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            content_hash: content_hash(&text),
            text,
            embedding,
            source_ref,
            entity_ids: BTreeSet::new(),
        }
    }

    /// Attach the ids of entities mentioned in this chunk
    pub fn with_entities(mut self, entity_ids: impl IntoIterator<Item = EntityId>) -> Self {
        self.entity_ids.extend(entity_ids);
        self
    }
}

/// SHA-256 of `text`, hex encoded
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// An entity mention produced by extraction, not yet merged into the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCandidate {
    /// Name as it should be displayed
    pub name: String,
    /// Kind of object
    pub entity_type: EntityType,
    /// Attributes observed alongside the mention
    pub attributes: BTreeMap<String, String>,
    /// Originating chunk or document
    pub source_ref: SourceRef,
}

impl EntityCandidate {
    /// Create a candidate without attributes
    pub fn new(name: impl Into<String>, entity_type: EntityType, source_ref: SourceRef) -> Self {
        Self {
            name: name.into(),
            entity_type,
            attributes: BTreeMap::new(),
            source_ref,
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Id the candidate merges into
    pub fn entity_id(&self) -> EntityId {
        EntityId::for_entity(&self.name, self.entity_type)
    }
}

/// A relation mention produced by extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationCandidate {
    /// Source endpoint
    pub source: EntityCandidate,
    /// Target endpoint
    pub target: EntityCandidate,
    /// Relation label
    pub relation_type: String,
    /// Confidence the rule assigns to this relation
    pub confidence: f32,
    /// Originating chunk or document
    pub source_ref: SourceRef,
}

impl RelationCandidate {
    /// Create a relation candidate; confidence is clamped to [0, 1]
    pub fn new(
        source: EntityCandidate,
        target: EntityCandidate,
        relation_type: impl Into<String>,
        confidence: f32,
        source_ref: SourceRef,
    ) -> Self {
        Self {
            source,
            target,
            relation_type: relation_type.into(),
            confidence: clamp_confidence(confidence),
            source_ref,
        }
    }
}

/// Union `incoming` into `attributes`; on conflict the lexicographically smaller value stays.
///
/// The rule is order independent, which keeps entity merges commutative.
pub fn merge_attributes(
    attributes: &mut BTreeMap<String, String>,
    incoming: &BTreeMap<String, String>,
) {
    for (key, value) in incoming {
        match attributes.get_mut(key) {
            Some(existing) if value < existing => *existing = value.clone(),
            Some(_) => {},
            None => {
                attributes.insert(key.clone(), value.clone());
            },
        }
    }
}

/// Clamp a score into [0, 1]; NaN becomes 0
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_depend_only_on_identity_key() {
        let a = EntityId::for_entity("INSAT-3D", EntityType::Satellite);
        let b = EntityId::for_entity("insat 3d", EntityType::Satellite);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "satellite:insat_3d");

        let product = EntityId::for_entity("Wind_Data", EntityType::DataProduct);
        assert_eq!(product.as_str(), "data_product:wind_data");
        assert_ne!(a, EntityId::for_entity("INSAT-3D", EntityType::Mission));
    }

    #[test]
    fn chunk_ids_follow_content_hash() {
        let source = SourceRef::new("https://mosdac.gov.in/insat-3d");
        let a = Chunk::new("INSAT-3D carries an imager.", vec![0.0; 4], source.clone());
        let b = Chunk::new("INSAT-3D carries an imager.", vec![1.0; 4], source);
        assert_eq!(a.id, b.id);
        assert_eq!(a.content_hash.len(), 64);
        assert!(a.id.0.starts_with("chunk_"));
    }

    #[test]
    fn relation_candidates_clamp_confidence() {
        let source = SourceRef::new("doc");
        let sat = EntityCandidate::new("SARAL", EntityType::Satellite, source.clone());
        let inst = EntityCandidate::new("AltiKa", EntityType::Instrument, source.clone());
        let rel = RelationCandidate::new(sat, inst, "carries", 1.7, source);
        assert_eq!(rel.confidence, 1.0);
        assert_eq!(clamp_confidence(f32::NAN), 0.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
    }

    #[test]
    fn entity_type_round_trips_through_strings() {
        assert_eq!(EntityType::DataProduct.to_string(), "data_product");
        assert_eq!("instrument".parse::<EntityType>().ok(), Some(EntityType::Instrument));
    }
}
