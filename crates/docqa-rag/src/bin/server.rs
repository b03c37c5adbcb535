//! Document Q&A server binary
//!
//! Run with: cargo run -p docqa-rag --bin docqa-server -- --port 8000

use clap::Parser;
use docqa_rag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP server exposing /ingest and /query over session-scoped document indexes
#[derive(Parser, Debug)]
#[command(name = "docqa-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides config and DOCQA_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config and DOCQA_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.ensure_api_key()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Provider: {:?}", config.provider.kind);
    tracing::info!(
        "  - Chunk size: {} tokens ({} overlap)",
        config.chunking.max_chunk_tokens,
        config.chunking.overlap_tokens
    );
    tracing::info!("  - Default top_k: {}", config.retrieval.top_k);

    let server = RagServer::new(config)?;

    let pipeline = server.state().pipeline();
    if !pipeline.providers_healthy().await {
        tracing::warn!(
            "Provider '{}' is not reachable; requests will fail until it is",
            pipeline.embedder().name()
        );
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /ingest    - Load documents into a session");
    println!("  POST /query     - Retrieve context for a question");
    println!("  GET  /sessions  - List sessions");
    println!("  GET  /info      - Service info");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
