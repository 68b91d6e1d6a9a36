//! # OrbitRAG Core
//!
//! Retrieval core of a help bot for a satellite-data portal (MOSDAC): a
//! knowledge graph of satellites, instruments, data products and services,
//! built from portal documents by rule-based extraction, combined with a
//! vector index over the same documents.
//!
//! This crate provides:
//! - Text normalization, sentence segmentation and chunking
//! - Gazetteer and rule-table entity and relation extraction
//! - A deduplicating knowledge graph with k-hop traversal and fuzzy lookup
//! - An exact cosine-similarity vector index
//! - Hybrid retrieval that fuses graph facts and passages under a budget
//! - JSON snapshots of the whole knowledge base
//!
//! ## Feature Flags
//!
//! - `parallel-processing` (default): run extraction and similarity scoring
//!   on the rayon thread pool
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use orbitrag_core::{Config, OrbitRag, SourceRef};
//! use orbitrag_core::embeddings::HashingEmbedder;
//! use orbitrag_core::query::ConversationContext;
//!
//! # async fn example() -> orbitrag_core::Result<()> {
//! let config = Config::default();
//! let embedder = Arc::new(HashingEmbedder::new(config.vector.dimension));
//! let orbitrag = OrbitRag::new(config, embedder)?;
//!
//! orbitrag
//!     .ingest("OCEANSAT-2 carries OCM which measures chlorophyll.", &SourceRef::new("faq"))
//!     .await;
//! let context = orbitrag
//!     .retrieve("What does OCEANSAT-2 carry?", &ConversationContext::default())
//!     .await;
//! println!("{}", context.render());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ================================
// MODULE DECLARATIONS
// ================================

/// Configuration management and loading
pub mod config;
/// Core types, errors and boundary traits
pub mod core;
/// Embedding providers
pub mod embeddings;
/// Entity and relation extraction
pub mod entity;
/// Knowledge graph store and traversal
pub mod graph;
/// Snapshot persistence
pub mod persistence;
/// Document ingestion
pub mod pipeline;
/// Query analysis and conversation history
pub mod query;
/// Hybrid retrieval and fusion
pub mod retrieval;
/// Shared knowledge base handles
pub mod storage;
/// Text normalization and chunking
pub mod text;
/// Vector index
pub mod vector;

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::config::{Config, Validatable};
    pub use crate::core::{
        Chunk, ChunkId, Entity, EntityId, EntityType, OrbitRagError, Relation, Result, SourceRef,
    };
    pub use crate::embeddings::EmbeddingProvider;
    pub use crate::graph::KnowledgeGraph;
    pub use crate::query::ConversationContext;
    pub use crate::retrieval::{HybridRetriever, RetrievedContext};
    pub use crate::storage::KnowledgeBase;
    pub use crate::OrbitRag;
}

// Re-export core types
pub use crate::config::Config;
pub use crate::core::{
    AnswerGenerator, AnswerRequest, Chunk, ChunkId, Entity, EntityCandidate, EntityId, EntityType,
    ErrorContext, ErrorSeverity, OrbitRagError, Relation, RelationCandidate, Result, SourceRef,
};
pub use crate::graph::KnowledgeGraph;
pub use crate::vector::VectorIndex;

use std::path::Path;
use std::sync::Arc;

use crate::config::Validatable;
use crate::embeddings::EmbeddingProvider;
use crate::pipeline::{IngestReport, IngestionPipeline};
use crate::query::ConversationContext;
use crate::retrieval::{HybridRetriever, RetrievedContext};
use crate::storage::KnowledgeBase;

// ================================
// MAIN SYSTEM
// ================================

/// Ingestion and retrieval over one shared knowledge base.
///
/// Ingestion and retrieval can run concurrently from different tasks; both
/// take `&self`.
pub struct OrbitRag {
    config: Config,
    knowledge: KnowledgeBase,
    pipeline: IngestionPipeline,
    retriever: HybridRetriever,
}

impl OrbitRag {
    /// Validate `config` and build an empty system
    pub fn new(config: Config, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let knowledge = KnowledgeBase::from_config(&config);
        Self::with_knowledge(config, knowledge, embedder)
    }

    /// Build around an existing knowledge base, for example a loaded snapshot.
    ///
    /// The graph adopts `config.graph.fuzzy_match_threshold`. Fails with
    /// `DimensionMismatch` when the index dimension differs from
    /// `config.vector.dimension`.
    pub fn with_knowledge(
        config: Config,
        knowledge: KnowledgeBase,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate().into_result()?;
        let index_dimension = knowledge.vectors().dimension();
        if index_dimension != config.vector.dimension {
            return Err(OrbitRagError::DimensionMismatch {
                expected: config.vector.dimension,
                actual: index_dimension,
            });
        }
        knowledge
            .graph_mut()
            .set_fuzzy_threshold(config.graph.fuzzy_match_threshold);
        if embedder.dimensions() != config.vector.dimension {
            tracing::warn!(
                provider = embedder.provider_name(),
                provider_dimension = embedder.dimensions(),
                index_dimension = config.vector.dimension,
                "embedding provider dimension differs from index; vectors will be rejected"
            );
        }
        let pipeline = IngestionPipeline::from_config(&config, knowledge.clone(), Arc::clone(&embedder))?;
        let retriever = HybridRetriever::from_config(&config, knowledge.reader(), embedder)?;
        Ok(Self {
            config,
            knowledge,
            pipeline,
            retriever,
        })
    }

    /// Load the configuration file at `path` and build an empty system
    pub fn from_config_file(path: impl AsRef<Path>, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Self::new(Config::from_file(path)?, embedder)
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared knowledge base
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// The retriever
    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    /// Merge the curated portal catalogue into the graph
    pub fn seed_base_catalog(&self) {
        self.knowledge.seed_base_catalog();
    }

    /// Ingest one document
    pub async fn ingest(&self, text: &str, source_ref: &SourceRef) -> IngestReport {
        self.pipeline.ingest(text, source_ref).await
    }

    /// Gather fused context for a query
    pub async fn retrieve(&self, query: &str, conversation: &ConversationContext) -> RetrievedContext {
        self.retriever.retrieve(query, conversation).await
    }

    /// Retrieve, generate an answer and record the turn
    pub async fn answer(
        &self,
        query: &str,
        conversation: &mut ConversationContext,
        generator: &dyn AnswerGenerator,
    ) -> Result<String> {
        self.retriever.answer(query, conversation, generator).await
    }

    /// Fresh conversation sized from configuration
    pub fn new_conversation(&self) -> ConversationContext {
        ConversationContext::from_config(&self.config.conversation)
    }

    /// Save the knowledge base as a JSON snapshot
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        self.knowledge.save_snapshot(path)
    }
}
