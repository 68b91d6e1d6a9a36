//! Vector index over chunk embeddings.
//!
//! The index is exact (brute-force cosine similarity). Chunks are kept in
//! insertion order so that equal scores rank the earlier chunk first.

use std::collections::HashMap;

use indexmap::IndexMap;
#[cfg(feature = "parallel-processing")]
use rayon::prelude::*;

use crate::core::{Chunk, ChunkId, OrbitRagError, Result};

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The matching chunk
    pub chunk: Chunk,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Fixed-dimension store of chunk embeddings
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    chunks: IndexMap<ChunkId, Chunk>,
    hashes: HashMap<String, ChunkId>,
}

impl VectorIndex {
    /// Create an empty index accepting vectors of `dimension` components
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            chunks: IndexMap::new(),
            hashes: HashMap::new(),
        }
    }

    /// Fixed embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True when nothing has been indexed
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Store a chunk keyed by its id.
    ///
    /// Fails with `DimensionMismatch` if the embedding length differs from the
    /// index dimension. Returns `Ok(false)` without changes when a chunk with
    /// the same id or content hash is already stored.
    pub fn add(&mut self, chunk: Chunk) -> Result<bool> {
        if chunk.embedding.len() != self.dimension {
            return Err(OrbitRagError::DimensionMismatch {
                expected: self.dimension,
                actual: chunk.embedding.len(),
            });
        }
        if chunk.embedding.iter().any(|v| !v.is_finite()) {
            return Err(OrbitRagError::VectorSearch {
                message: format!("embedding for {} contains non-finite values", chunk.id),
            });
        }
        if self.chunks.contains_key(&chunk.id) || self.hashes.contains_key(&chunk.content_hash) {
            return Ok(false);
        }

        self.hashes.insert(chunk.content_hash.clone(), chunk.id.clone());
        self.chunks.insert(chunk.id.clone(), chunk);
        Ok(true)
    }

    /// Look up a chunk by id
    pub fn get(&self, id: &ChunkId) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    /// Whether text with this content hash has been indexed
    pub fn contains_hash(&self, content_hash: &str) -> bool {
        self.hashes.contains_key(content_hash)
    }

    /// Chunks in insertion order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// The `top_k` most similar chunks in strictly non-increasing score order.
    ///
    /// Ties keep insertion order. An empty index yields an empty result.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.search_where(query, top_k, |_| true)
    }

    /// Search restricted to chunks accepted by `filter`
    pub fn search_where<F>(&self, query: &[f32], top_k: usize, filter: F) -> Result<Vec<SearchHit>>
    where
        F: Fn(&Chunk) -> bool + Sync,
    {
        if self.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(OrbitRagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(OrbitRagError::VectorSearch {
                message: "query embedding contains non-finite values".to_string(),
            });
        }

        let mut scored = self.score_all(query, &filter);
        // Stable sort: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(chunk, score)| SearchHit {
                chunk: chunk.clone(),
                score,
            })
            .collect())
    }

    /// Chunks most similar to an indexed chunk, excluding the chunk itself
    pub fn similar_to(&self, id: &ChunkId, top_k: usize) -> Result<Vec<SearchHit>> {
        let chunk = self.chunks.get(id).ok_or_else(|| OrbitRagError::NotFound {
            resource: "Chunk".to_string(),
            id: id.to_string(),
        })?;
        self.search_where(&chunk.embedding, top_k, |other| other.id != *id)
    }

    #[cfg(feature = "parallel-processing")]
    fn score_all<F>(&self, query: &[f32], filter: &F) -> Vec<(&Chunk, f32)>
    where
        F: Fn(&Chunk) -> bool + Sync,
    {
        let chunks: Vec<&Chunk> = self.chunks.values().collect();
        // collect keeps input order, so ties still follow insertion
        chunks
            .par_iter()
            .filter(|chunk| filter(chunk))
            .map(|chunk| (*chunk, VectorUtils::cosine_similarity(query, &chunk.embedding)))
            .collect()
    }

    #[cfg(not(feature = "parallel-processing"))]
    fn score_all<F>(&self, query: &[f32], filter: &F) -> Vec<(&Chunk, f32)>
    where
        F: Fn(&Chunk) -> bool + Sync,
    {
        self.chunks
            .values()
            .filter(|chunk| filter(chunk))
            .map(|chunk| (chunk, VectorUtils::cosine_similarity(query, &chunk.embedding)))
            .collect()
    }
}

/// Utility functions for vector operations
pub struct VectorUtils;

impl VectorUtils {
    /// Calculate cosine similarity between two vectors
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot_product / (norm_a * norm_b)
        }
    }

    /// Normalize a vector to unit length
    pub fn normalize(vector: &mut [f32]) {
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector {
                *x /= norm;
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceRef;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk::with_id(id, format!("text of {id}"), embedding, SourceRef::new("doc"))
    }

    #[test]
    fn rejects_wrong_dimension() {
        let mut index = VectorIndex::new(3);
        let err = index.add(chunk("a", vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(
            err,
            OrbitRagError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let mut index = VectorIndex::new(2);
        // cos = 0.9, 0.5, 0.9 against [1, 0]
        let high = vec![0.9, (1.0f32 - 0.81).sqrt()];
        let low = vec![0.5, (1.0f32 - 0.25).sqrt()];
        index.add(chunk("first", high.clone())).unwrap();
        index.add(chunk("middle", low)).unwrap();
        index.add(chunk("last", high)).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.0.as_str()).collect();
        assert_eq!(ids, vec!["first", "last", "middle"]);
        assert!((hits[0].score - 0.9).abs() < 1e-5);
        assert!((hits[2].score - 0.5).abs() < 1e-5);
    }

    #[test]
    fn top_k_larger_than_index_returns_everything() {
        let mut index = VectorIndex::new(2);
        index.add(chunk("a", vec![1.0, 0.0])).unwrap();
        index.add(chunk("b", vec![0.0, 1.0])).unwrap();
        assert_eq!(index.search(&[1.0, 1.0], 10).unwrap().len(), 2);
        assert_eq!(index.search(&[1.0, 1.0], 1).unwrap().len(), 1);
    }

    #[test]
    fn empty_index_returns_empty() {
        let index = VectorIndex::new(4);
        assert!(index.search(&[0.0; 4], 5).unwrap().is_empty());
        // Even a malformed query is not an error on an empty index
        assert!(index.search(&[0.0; 2], 5).unwrap().is_empty());
    }

    #[test]
    fn query_dimension_is_checked() {
        let mut index = VectorIndex::new(2);
        index.add(chunk("a", vec![1.0, 0.0])).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn duplicate_content_is_a_no_op() {
        let mut index = VectorIndex::new(2);
        let source = SourceRef::new("doc");
        assert!(index.add(Chunk::new("same text", vec![1.0, 0.0], source.clone())).unwrap());
        assert!(!index.add(Chunk::new("same text", vec![0.0, 1.0], source)).unwrap());
        assert_eq!(index.len(), 1);
        assert_eq!(index.chunks().next().unwrap().embedding, vec![1.0, 0.0]);
    }

    #[test]
    fn filtered_and_similar_search() {
        let mut index = VectorIndex::new(2);
        index.add(chunk("a", vec![1.0, 0.0])).unwrap();
        index.add(chunk("b", vec![0.9, 0.1])).unwrap();
        index.add(chunk("c", vec![0.0, 1.0])).unwrap();

        let similar = index.similar_to(&ChunkId::from("a"), 1).unwrap();
        assert_eq!(similar[0].chunk.id, ChunkId::from("b"));

        let filtered = index
            .search_where(&[1.0, 0.0], 3, |c| c.id != ChunkId::from("a"))
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(index.similar_to(&ChunkId::from("zzz"), 1).is_err());
    }

    #[test]
    fn vector_utils() {
        assert_eq!(VectorUtils::cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        let mut v = vec![3.0, 4.0];
        VectorUtils::normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn non_finite_query_is_rejected() {
        let mut index = VectorIndex::new(2);
        index.add(chunk("a", vec![1.0, 0.0])).unwrap();
        index.add(chunk("b", vec![0.0, 1.0])).unwrap();

        for query in [[f32::NAN, 1.0], [0.0, f32::INFINITY]] {
            let err = index.search(&query, 2).unwrap_err();
            assert!(matches!(err, OrbitRagError::VectorSearch { .. }));
        }
    }
}
