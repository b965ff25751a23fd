//! Document Q&A server binary
//!
//! Run with: cargo run -p docqa --bin docqa-server

use std::sync::Arc;

use docqa::{
    config::RagConfig,
    pipeline::{prepare_ollama, DocumentPipeline},
    providers::OllamaClient,
    server::{state::AppState, RagServer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                          docqa                            ║
║         Ask questions about your uploaded documents       ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Upload directory: {}", config.server.upload_dir.display());

    let ollama = Arc::new(OllamaClient::new(config.llm.base_url.clone()));
    tracing::info!("Checking Ollama at {}...", ollama.base_url());
    match prepare_ollama(&ollama, &config).await {
        Ok(true) => tracing::info!("Ollama is running"),
        Ok(false) => {
            tracing::warn!("Ollama not available at {}", ollama.base_url());
            tracing::warn!("  Start it with: ollama serve");
            tracing::warn!(
                "  Pull models: ollama pull {} && ollama pull {}",
                config.embeddings.model,
                config.llm.generate_model
            );
        }
        Err(e) => tracing::warn!("Ollama model preparation failed: {}", e),
    }

    let pipeline = DocumentPipeline::with_ollama(&config, ollama)?;
    let server = RagServer::new(AppState::new(config, pipeline));

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload        - Upload a document (field: file)");
    println!("  POST /ask-question  - Ask a question (field: question)");
    println!("  GET  /health        - Health check");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
