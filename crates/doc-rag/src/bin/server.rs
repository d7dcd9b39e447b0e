//! doc-rag HTTP server
//!
//! Run with: cargo run -p doc-rag --bin doc-rag-server
//! Configuration: `DOC_RAG_CONFIG=/path/to/config.toml`, `.env` and environment.

use doc_rag::{config::RagConfig, evaluation::ScoreTarget, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::load(None)?;

    tracing::info!("Configuration loaded");
    tracing::info!(
        "  - Embeddings: {:?} {}",
        config.embeddings.backend,
        config.embeddings.model
    );
    tracing::info!(
        "  - LLM: {:?} {} (temperature {})",
        config.llm.backend,
        config.llm.generate_model,
        config.llm.temperature
    );
    tracing::info!("  - Top k: {}", config.retrieval.top_k);
    tracing::info!("  - Work dir: {}", config.server.work_dir.display());
    if config.evaluation.score_target == ScoreTarget::Question {
        tracing::warn!(
            "Answers are scored against the question text; set evaluation.score_target = \"reference\" to score against reference answers"
        );
    }

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/evaluate   - Evaluate a document against a questions CSV");
    println!("  POST /api/normalize  - Normalize an XML document");
    println!("  POST /api/ingest     - Upload and ingest into the knowledge base");
    println!("  POST /api/kb/query   - Ask the knowledge base");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
