//! Curated base catalogue of the satellite data portal.
//!
//! Seeding gives a fresh store the organizations, satellite families, headline
//! products and portal services before any document has been ingested.

use super::{KnowledgeGraph, MergeStats};
use crate::core::{EntityCandidate, EntityType, RelationCandidate, SourceRef};
use crate::entity::DEFAULT_GAZETTEER;

/// Source ref attached to catalogue facts
pub const BASE_CATALOG_SOURCE: &str = "catalog:base";

const BASE_ENTITIES: &[(&str, EntityType)] = &[
    ("ISRO", EntityType::Organization),
    ("MOSDAC", EntityType::Organization),
    ("INSAT", EntityType::Satellite),
    ("OCEANSAT", EntityType::Satellite),
    ("CARTOSAT", EntityType::Satellite),
    ("RESOURCESAT", EntityType::Satellite),
    ("SST", EntityType::DataProduct),
    ("Chlorophyll", EntityType::DataProduct),
    ("Wind Data", EntityType::DataProduct),
    ("Land Cover", EntityType::DataProduct),
    ("Bathymetry", EntityType::DataProduct),
    ("Data Download", EntityType::Other),
    ("Visualization", EntityType::Other),
    ("API Access", EntityType::Other),
    ("User Registration", EntityType::Other),
];

const BASE_RELATIONS: &[(&str, &str, &str)] = &[
    ("ISRO", "operates", "MOSDAC"),
    ("MOSDAC", "provides", "Data Download"),
    ("MOSDAC", "provides", "Visualization"),
    ("MOSDAC", "provides", "API Access"),
    ("MOSDAC", "provides", "User Registration"),
    ("INSAT", "generates", "SST"),
    ("OCEANSAT", "generates", "Chlorophyll"),
    ("OCEANSAT", "generates", "Wind Data"),
    ("CARTOSAT", "generates", "Land Cover"),
    ("RESOURCESAT", "generates", "Land Cover"),
];

/// Catalogue entities, with gazetteer descriptions attached
pub fn base_entities() -> Vec<EntityCandidate> {
    let source = SourceRef::new(BASE_CATALOG_SOURCE);
    BASE_ENTITIES
        .iter()
        .map(|&(name, entity_type)| {
            let mut candidate = EntityCandidate::new(name, entity_type, source.clone());
            let description = DEFAULT_GAZETTEER
                .iter()
                .find(|entry| entry.canonical == name && entry.entity_type == entity_type)
                .and_then(|entry| entry.description);
            if let Some(description) = description {
                candidate = candidate.with_attribute("description", description);
            }
            candidate
        })
        .collect()
}

/// Catalogue relations, each at full confidence
pub fn base_relations() -> Vec<RelationCandidate> {
    let entities = base_entities();
    let source = SourceRef::new(BASE_CATALOG_SOURCE);
    BASE_RELATIONS
        .iter()
        .filter_map(|&(from, relation_type, to)| {
            let from = entities.iter().find(|e| e.name == from)?;
            let to = entities.iter().find(|e| e.name == to)?;
            Some(RelationCandidate::new(from.clone(), to.clone(), relation_type, 1.0, source.clone()))
        })
        .collect()
}

impl KnowledgeGraph {
    /// Merge the base catalogue. Idempotent.
    pub fn seed_base_catalog(&mut self) -> MergeStats {
        let entities = base_entities();
        let relations = base_relations();
        for entity in &entities {
            self.upsert_entity(entity);
        }
        for relation in &relations {
            self.upsert_relation(relation);
        }
        tracing::info!(
            entities = entities.len(),
            relations = relations.len(),
            "seeded base catalogue"
        );
        MergeStats {
            entities: entities.len(),
            relations: relations.len(),
        }
    }
}
