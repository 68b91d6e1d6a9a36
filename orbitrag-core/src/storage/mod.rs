//! Shared knowledge base handles.
//!
//! [`KnowledgeBase`] owns the graph and the vector index behind
//! `parking_lot` read-write locks; ingestion writes through it. Query
//! handling gets a [`KnowledgeReader`], which can only take read guards, so
//! many retrievals run concurrently while writers serialize. When both locks
//! are needed the graph lock is always taken first.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::Config;
use crate::graph::KnowledgeGraph;
use crate::vector::VectorIndex;

/// Entity, relation and chunk counts at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KnowledgeStats {
    /// Stored entities
    pub entities: usize,
    /// Stored relations
    pub relations: usize,
    /// Indexed chunks
    pub chunks: usize,
}

/// Writable handle to the graph and the vector index
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    graph: Arc<RwLock<KnowledgeGraph>>,
    vectors: Arc<RwLock<VectorIndex>>,
}

impl KnowledgeBase {
    /// Empty knowledge base with an index of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self::from_parts(KnowledgeGraph::new(), VectorIndex::new(dimension))
    }

    /// Empty knowledge base built from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::from_parts(
            KnowledgeGraph::from_config(&config.graph),
            VectorIndex::new(config.vector.dimension),
        )
    }

    /// Wrap an existing graph and index
    pub fn from_parts(graph: KnowledgeGraph, vectors: VectorIndex) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            vectors: Arc::new(RwLock::new(vectors)),
        }
    }

    /// Read-only handle sharing the same stores
    pub fn reader(&self) -> KnowledgeReader {
        KnowledgeReader {
            graph: Arc::clone(&self.graph),
            vectors: Arc::clone(&self.vectors),
        }
    }

    /// Read access to the graph
    pub fn graph(&self) -> RwLockReadGuard<'_, KnowledgeGraph> {
        self.graph.read()
    }

    /// Read access to the vector index
    pub fn vectors(&self) -> RwLockReadGuard<'_, VectorIndex> {
        self.vectors.read()
    }

    /// Exclusive access to the graph
    pub fn graph_mut(&self) -> RwLockWriteGuard<'_, KnowledgeGraph> {
        self.graph.write()
    }

    /// Exclusive access to the vector index
    pub fn vectors_mut(&self) -> RwLockWriteGuard<'_, VectorIndex> {
        self.vectors.write()
    }

    /// Merge the curated base catalogue into the graph
    pub fn seed_base_catalog(&self) {
        self.graph.write().seed_base_catalog();
    }

    /// Current counts
    pub fn stats(&self) -> KnowledgeStats {
        self.reader().stats()
    }
}

/// Read-only handle used by the retrieval path
#[derive(Debug, Clone)]
pub struct KnowledgeReader {
    graph: Arc<RwLock<KnowledgeGraph>>,
    vectors: Arc<RwLock<VectorIndex>>,
}

impl KnowledgeReader {
    /// Read access to the graph
    pub fn graph(&self) -> RwLockReadGuard<'_, KnowledgeGraph> {
        self.graph.read()
    }

    /// Read access to the vector index
    pub fn vectors(&self) -> RwLockReadGuard<'_, VectorIndex> {
        self.vectors.read()
    }

    /// Current counts
    pub fn stats(&self) -> KnowledgeStats {
        let graph = self.graph.read();
        let vectors = self.vectors.read();
        KnowledgeStats {
            entities: graph.entity_count(),
            relations: graph.relation_count(),
            chunks: vectors.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Chunk, EntityCandidate, EntityType, SourceRef};

    #[test]
    fn reader_sees_writes() {
        let knowledge = KnowledgeBase::new(2);
        let reader = knowledge.reader();
        assert_eq!(reader.stats(), KnowledgeStats::default());

        knowledge.graph_mut().upsert_entity(&EntityCandidate::new(
            "INSAT-3D",
            EntityType::Satellite,
            SourceRef::new("doc"),
        ));
        knowledge
            .vectors_mut()
            .add(Chunk::new("INSAT-3D imager", vec![1.0, 0.0], SourceRef::new("doc")))
            .unwrap();

        let stats = reader.stats();
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.chunks, 1);
        assert!(reader.graph().find_by_name("insat 3d").is_some());
    }

    #[test]
    fn concurrent_readers() {
        let knowledge = KnowledgeBase::new(4);
        knowledge.seed_base_catalog();
        let expected = knowledge.stats();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reader = knowledge.reader();
                std::thread::spawn(move || reader.stats())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
