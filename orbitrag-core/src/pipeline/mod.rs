//! Ingestion pipeline.
//!
//! ```text
//! text → [chunk] → [dedup by content hash] → [extract] ─→ [merge into graph]
//!                                          └→ [embed]  ─→ [add to index]
//! ```
//!
//! Extraction runs on the rayon pool when `parallel-processing` is enabled.
//! Embedding runs concurrently up to `embedding.max_concurrency` calls, each
//! bounded by `embedding.timeout_ms`. Graph merges happen under one write
//! lock per document. A chunk whose embedding fails or has the wrong
//! dimension still contributes its entities and relations to the graph; only
//! its vector entry is skipped, and the failure is recorded in the report.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
#[cfg(feature = "parallel-processing")]
use rayon::prelude::*;

use crate::config::{Config, EmbeddingConfig};
use crate::core::{content_hash, Chunk, Result, SourceRef};
use crate::embeddings::{embed_with_timeout, EmbeddingProvider};
use crate::entity::{ExtractionOutput, Extractor};
use crate::storage::KnowledgeBase;
use crate::text::TextChunker;

/// What one ingestion call changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Chunks added to the vector index
    pub chunks_indexed: usize,
    /// Chunks whose content was already indexed
    pub chunks_skipped: usize,
    /// Chunks whose vector entry could not be stored
    pub chunks_rejected: usize,
    /// Entity upserts applied to the graph
    pub entities_upserted: usize,
    /// Relation upserts applied to the graph
    pub relations_upserted: usize,
    /// One message per rejected chunk
    pub errors: Vec<String>,
}

impl IngestReport {
    /// Fold another report into this one
    pub fn absorb(&mut self, other: IngestReport) {
        self.chunks_indexed += other.chunks_indexed;
        self.chunks_skipped += other.chunks_skipped;
        self.chunks_rejected += other.chunks_rejected;
        self.entities_upserted += other.entities_upserted;
        self.relations_upserted += other.relations_upserted;
        self.errors.extend(other.errors);
    }
}

/// Feeds documents into a [`KnowledgeBase`]
pub struct IngestionPipeline {
    knowledge: KnowledgeBase,
    chunker: TextChunker,
    extractor: Extractor,
    embedder: Arc<dyn EmbeddingProvider>,
    embedding: EmbeddingConfig,
}

impl IngestionPipeline {
    /// Pipeline with default chunking and embedding limits
    pub fn new(knowledge: KnowledgeBase, extractor: Extractor, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::from_parts(Config::default(), knowledge, extractor, embedder)
    }

    /// Pipeline configured from `config`
    pub fn from_config(
        config: &Config,
        knowledge: KnowledgeBase,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let extractor = Extractor::from_config(&config.extraction)?;
        Ok(Self::from_parts(config.clone(), knowledge, extractor, embedder))
    }

    fn from_parts(
        config: Config,
        knowledge: KnowledgeBase,
        extractor: Extractor,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            knowledge,
            chunker: TextChunker::from_config(&config.text),
            extractor,
            embedder,
            embedding: config.embedding,
        }
    }

    /// Replace the chunker
    pub fn with_chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// The knowledge base being written
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Ingest one document. Content already indexed is a no-op.
    pub async fn ingest(&self, text: &str, source_ref: &SourceRef) -> IngestReport {
        let mut report = IngestReport::default();

        let pieces = {
            let vectors = self.knowledge.vectors();
            let mut seen = HashSet::new();
            let mut fresh = Vec::new();
            for piece in self.chunker.chunk(text) {
                let hash = content_hash(&piece);
                if vectors.contains_hash(&hash) || !seen.insert(hash) {
                    report.chunks_skipped += 1;
                } else {
                    fresh.push(piece);
                }
            }
            fresh
        };
        if pieces.is_empty() {
            tracing::debug!(source_ref = %source_ref, skipped = report.chunks_skipped, "nothing new to ingest");
            return report;
        }

        let extractions = self.extract_all(&pieces, source_ref);
        let embeddings = self.embed_all(&pieces).await;

        {
            let mut graph = self.knowledge.graph_mut();
            for output in &extractions {
                let stats = graph.merge_extraction(output);
                report.entities_upserted += stats.entities;
                report.relations_upserted += stats.relations;
            }
        }

        {
            let mut vectors = self.knowledge.vectors_mut();
            for ((piece, output), embedding) in pieces.into_iter().zip(&extractions).zip(embeddings) {
                let added = embedding.and_then(|embedding| {
                    let chunk = Chunk::new(piece, embedding, source_ref.clone()).with_entities(output.entity_ids());
                    vectors.add(chunk)
                });
                match added {
                    Ok(true) => report.chunks_indexed += 1,
                    Ok(false) => report.chunks_skipped += 1,
                    Err(e) => {
                        tracing::warn!(source_ref = %source_ref, error = %e, "chunk not indexed");
                        report.chunks_rejected += 1;
                        report.errors.push(e.to_string());
                    },
                }
            }
        }

        tracing::info!(
            source_ref = %source_ref,
            chunks_indexed = report.chunks_indexed,
            chunks_skipped = report.chunks_skipped,
            chunks_rejected = report.chunks_rejected,
            entities = report.entities_upserted,
            relations = report.relations_upserted,
            "ingested document"
        );
        report
    }

    /// Ingest documents one after another, returning the combined report
    pub async fn ingest_batch<I, T>(&self, documents: I) -> IngestReport
    where
        I: IntoIterator<Item = (T, SourceRef)>,
        T: AsRef<str>,
    {
        let mut report = IngestReport::default();
        for (text, source_ref) in documents {
            report.absorb(self.ingest(text.as_ref(), &source_ref).await);
        }
        report
    }

    #[cfg(feature = "parallel-processing")]
    fn extract_all(&self, pieces: &[String], source_ref: &SourceRef) -> Vec<ExtractionOutput> {
        pieces
            .par_iter()
            .map(|piece| self.extractor.extract(piece, source_ref))
            .collect()
    }

    #[cfg(not(feature = "parallel-processing"))]
    fn extract_all(&self, pieces: &[String], source_ref: &SourceRef) -> Vec<ExtractionOutput> {
        pieces
            .iter()
            .map(|piece| self.extractor.extract(piece, source_ref))
            .collect()
    }

    async fn embed_all(&self, pieces: &[String]) -> Vec<Result<Vec<f32>>> {
        let timeout = self.embedding.timeout();
        let embedder = self.embedder.as_ref();
        let mut results: Vec<(usize, Result<Vec<f32>>)> = stream::iter(0..pieces.len())
            .map(|i| {
                let piece = &pieces[i];
                async move { (i, embed_with_timeout(embedder, piece, timeout).await) }
            })
            .buffer_unordered(self.embedding.max_concurrency.max(1))
            .collect()
            .await;
        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, result)| result).collect()
    }
}
