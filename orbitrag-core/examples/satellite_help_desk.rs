//! Help-desk walkthrough: seed the catalogue, ingest a few portal FAQs and
//! answer a short conversation.
//!
//! Run with `RUST_LOG=orbitrag_core=debug` to see retrieval decisions.

use std::sync::Arc;

use async_trait::async_trait;
use orbitrag_core::embeddings::HashingEmbedder;
use orbitrag_core::{AnswerGenerator, AnswerRequest, Config, OrbitRag, Result, SourceRef};
use tracing_subscriber::EnvFilter;

const FAQS: &[(&str, &str)] = &[
    (
        "faq/insat-3d",
        "INSAT-3D carries a six channel Imager. The Imager generates SST. \
         SST is available in NetCDF. INSAT-3D was launched in July 2013 into a geostationary orbit.",
    ),
    (
        "faq/oceansat-2",
        "OCEANSAT-2 carries OCM which measures chlorophyll. OCEANSAT-2 also carries OSCAT.",
    ),
    (
        "faq/saral",
        "The AltiKa altimeter onboard SARAL measures sea surface height.",
    ),
    (
        "help/orders",
        "Large orders are delivered through an FTP link within two days.",
    ),
];

/// Stands in for a hosted model: replies with the context it was given
struct ContextEcho;

#[async_trait]
impl AnswerGenerator for ContextEcho {
    async fn generate(&self, request: &AnswerRequest) -> Result<String> {
        Ok(format!("Based on the portal knowledge base:\n{}", request.context))
    }

    fn generator_name(&self) -> &str {
        "context-echo"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::default();
    let embedder = Arc::new(HashingEmbedder::new(config.vector.dimension));
    let orbitrag = OrbitRag::new(config, embedder)?;

    orbitrag.seed_base_catalog();
    for (source, text) in FAQS {
        let report = orbitrag.ingest(text, &SourceRef::new(*source)).await;
        println!(
            "ingested {source}: {} chunks, {} relations",
            report.chunks_indexed, report.relations_upserted
        );
    }
    println!("{:?}\n", orbitrag.knowledge().stats());

    let mut conversation = orbitrag.new_conversation();
    for question in [
        "What does OCEANSAT-2 carry?",
        "What else does it measure?",
        "In which format is SST available?",
        "How long do large orders take?",
        "Who won the cricket match?",
    ] {
        let context = orbitrag.retrieve(question, &conversation).await;
        println!("Q: {question}  [{}]", context.mode);
        let reply = orbitrag.answer(question, &mut conversation, &ContextEcho).await?;
        println!("A: {reply}\n");
    }

    let summary = conversation.summary();
    println!("{} turns, recent topics: {:?}", summary.total_turns, summary.recent_topics);
    Ok(())
}
