//! Snapshot persistence for the knowledge base.
//!
//! A snapshot is one JSON document holding every entity, relation and chunk.
//! Loading replays the records through the normal merge and add paths, so a
//! hand-edited or stale snapshot is re-validated (dimension, endpoints,
//! duplicate content) rather than trusted.
//!
//! ```no_run
//! use orbitrag_core::storage::KnowledgeBase;
//! use orbitrag_core::Config;
//!
//! # fn example() -> orbitrag_core::Result<()> {
//! let config = Config::default();
//! let knowledge = KnowledgeBase::from_config(&config);
//! knowledge.save_snapshot("./knowledge.json")?;
//! let restored = KnowledgeBase::load_snapshot("./knowledge.json", &config)?;
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, GraphConfig};
use crate::core::{Chunk, Entity, ErrorContext, OrbitRagError, Relation, Result};
use crate::graph::KnowledgeGraph;
use crate::storage::KnowledgeBase;
use crate::vector::VectorIndex;

/// Snapshot layout version written by this crate
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Serialized contents of a knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Layout version
    pub format_version: u32,
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
    /// Vector index dimension
    pub dimension: usize,
    /// All entities
    pub entities: Vec<Entity>,
    /// All relations
    pub relations: Vec<Relation>,
    /// All chunks, in insertion order
    pub chunks: Vec<Chunk>,
}

impl Snapshot {
    /// Capture a graph and an index
    pub fn capture(graph: &KnowledgeGraph, vectors: &VectorIndex) -> Self {
        let mut entities: Vec<Entity> = graph.entities().cloned().collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        let mut relations: Vec<Relation> = graph.relations().cloned().collect();
        relations.sort_by(|a, b| a.key().cmp(&b.key()));

        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            created_at: Utc::now(),
            dimension: vectors.dimension(),
            entities,
            relations,
            chunks: vectors.chunks().cloned().collect(),
        }
    }

    /// Rebuild a graph and an index from this snapshot.
    ///
    /// The graph takes its lookup settings from `config`; the index keeps the
    /// snapshot's dimension.
    pub fn restore(self, config: &GraphConfig) -> Result<(KnowledgeGraph, VectorIndex)> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(OrbitRagError::Serialization {
                message: format!(
                    "unsupported snapshot format version {} (expected {})",
                    self.format_version, SNAPSHOT_FORMAT_VERSION
                ),
            });
        }

        let mut graph = KnowledgeGraph::from_config(config);
        for entity in self.entities {
            graph.merge_entity(entity);
        }
        for relation in self.relations {
            graph.merge_relation(relation)?;
        }

        let mut vectors = VectorIndex::new(self.dimension);
        for chunk in self.chunks {
            vectors.add(chunk)?;
        }
        Ok((graph, vectors))
    }

    /// Write as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!(
            path = %path.display(),
            entities = self.entities.len(),
            relations = self.relations.len(),
            chunks = self.chunks.len(),
            "saved snapshot"
        );
        Ok(())
    }

    /// Read a snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| crate::storage_error!("cannot read snapshot {}: {e}", path.display()))?;
        serde_json::from_str(&content).map_err(|e| crate::storage_error!("malformed snapshot {}: {e}", path.display()))
    }
}

impl KnowledgeBase {
    /// Save the current graph and index to `path`
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = {
            let graph = self.graph();
            let vectors = self.vectors();
            Snapshot::capture(&graph, &vectors)
        };
        snapshot.save(path)
    }

    /// Load a knowledge base saved with [`save_snapshot`](Self::save_snapshot).
    ///
    /// The graph uses `config.graph`, and the stored index dimension must equal
    /// `config.vector.dimension`.
    pub fn load_snapshot(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let (graph, vectors) = Snapshot::load(path)?
            .restore(&config.graph)
            .with_context_lazy(|| format!("restoring snapshot {}", path.display()))?;
        if vectors.dimension() != config.vector.dimension {
            return Err(OrbitRagError::DimensionMismatch {
                expected: config.vector.dimension,
                actual: vectors.dimension(),
            });
        }
        Ok(Self::from_parts(graph, vectors))
    }
}
