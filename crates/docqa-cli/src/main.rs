//! Interactive document Q&A
//!
//! Loads every path given on the command line into one in-memory session and
//! answers questions typed at the prompt.
//!
//! Run with: cargo run -p docqa-cli -- ./docs notes.pdf

use anyhow::Result;
use clap::Parser;
use rustyline::{error::ReadlineError, DefaultEditor};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docqa_rag::{
    config::RagConfig,
    diagnostics::{PromptTokens, TokenReport},
    types::{AnswerResult, DocumentReference},
    RagPipeline,
};

const SESSION: &str = "cli";

/// Ask questions about local PDF, text and markdown files
#[derive(Parser, Debug)]
#[command(name = "docqa", version, about)]
struct Args {
    /// Files or directories to load
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chunks retrieved per question
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Print the sources and scores of the chunks used for each answer
    #[arg(long)]
    show_sources: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=warn,docqa=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(top_k) = args.top_k {
        config.retrieval.top_k = top_k;
    }
    config.validate()?;
    config.ensure_api_key()?;

    let pipeline = RagPipeline::from_config(&config)?;

    let references: Vec<DocumentReference> =
        args.paths.iter().map(DocumentReference::path).collect();
    let loaded = pipeline.load(&references).await?;

    for skipped in &loaded.skipped {
        println!("Skipped {}: {}", skipped.source, skipped.reason);
    }
    println!("Processing {} chunks from {} sources", loaded.chunks.len(), loaded.sources);
    println!("{}", TokenReport::from_chunks(&loaded.chunks));

    println!("Creating vector index...");
    let start = Instant::now();
    let outcome = pipeline.index(SESSION, loaded).await?;
    println!(
        "Indexed {} chunks in {:.2} seconds",
        outcome.chunks_indexed,
        start.elapsed().as_secs_f64()
    );

    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline("\nEnter a query: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(question) {
            tracing::debug!("Could not record history: {}", e);
        }

        match ask(&pipeline, question).await {
            Ok(answer) => print_answer(&answer, args.show_sources),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

async fn ask(pipeline: &RagPipeline, question: &str) -> docqa_rag::Result<AnswerResult> {
    let context = pipeline.retrieve(SESSION, question, None).await?;

    let chunks: Vec<_> = context.iter().map(|r| r.chunk.clone()).collect();
    tracing::info!("{}", PromptTokens::estimate(question, &chunks));

    pipeline.answer(question, context).await
}

fn print_answer(answer: &AnswerResult, show_sources: bool) {
    println!("{}", answer.answer.trim());

    if show_sources {
        println!("---");
        for result in &answer.used_context {
            println!(
                "  [{:.3}] {}",
                result.similarity,
                result.chunk.source_label()
            );
        }
    }
}
