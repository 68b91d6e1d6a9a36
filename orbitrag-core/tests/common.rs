//! Shared fixtures and helpers for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

pub use orbitrag_core::embeddings::HashingEmbedder;
pub use orbitrag_core::query::ConversationContext;
pub use orbitrag_core::retrieval::{ContextItem, RetrievalMode, RetrievedContext};
pub use orbitrag_core::{AnswerGenerator, AnswerRequest, Config, OrbitRag, Result, SourceRef};

/// Embedding dimension used across the integration tests
pub const TEST_DIMENSION: usize = 256;

/// Instrument and product facts about INSAT-3D
pub const INSAT_DOC: &str = "INSAT-3D carries a six channel Imager. \
    The Imager generates SST. \
    SST is available in NetCDF. \
    INSAT-3D was launched in July 2013 into a geostationary orbit.";

/// Ocean colour facts and an operator statement
pub const OCEANSAT_DOC: &str = "OCEANSAT-2 carries OCM which measures chlorophyll. \
    The Chandrayaan mission is operated by ISRO.";

/// Portal logistics with no catalogue vocabulary at all
pub const ORDERS_DOC: &str = "Large orders are delivered through an FTP link within two days. \
    Pending orders expire after seven days without confirmation.";

/// Every fixture document with its source ref
pub fn corpus() -> Vec<(&'static str, SourceRef)> {
    vec![
        (INSAT_DOC, SourceRef::new("faq/insat-3d")),
        (OCEANSAT_DOC, SourceRef::new("faq/oceansat-2")),
        (ORDERS_DOC, SourceRef::new("help/orders")),
    ]
}

/// Default configuration sized for the test embedder
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.vector.dimension = TEST_DIMENSION;
    config.text.chunk_size = 400;
    config.text.chunk_overlap = 0;
    config
}

/// A system with nothing ingested
pub fn empty_system(config: Config) -> OrbitRag {
    let embedder = Arc::new(HashingEmbedder::new(config.vector.dimension));
    OrbitRag::new(config, embedder).expect("test config is valid")
}

/// A system with the whole fixture corpus ingested
pub async fn build_system(config: Config) -> OrbitRag {
    let orbitrag = empty_system(config);
    for (text, source_ref) in corpus() {
        let report = orbitrag.ingest(text, &source_ref).await;
        assert!(report.errors.is_empty(), "ingest errors: {:?}", report.errors);
    }
    orbitrag
}

/// True if some retrieved item starts with `prefix`
pub fn has_item_starting_with(context: &RetrievedContext, prefix: &str) -> bool {
    context.items.iter().any(|item| item.text().starts_with(prefix))
}

/// Answer generator that records every request and echoes the context
#[derive(Default)]
pub struct RecordingGenerator {
    requests: Mutex<Vec<AnswerRequest>>,
}

impl RecordingGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<AnswerRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn generate(&self, request: &AnswerRequest) -> Result<String> {
        self.requests.lock().push(request.clone());
        Ok(format!("answer from {} context chars", request.context.chars().count()))
    }

    fn generator_name(&self) -> &str {
        "recording"
    }
}
