//! # DocQA RAG
//!
//! Ask natural-language questions over local documents.
//!
//! ## Pipeline
//!
//! - **Ingest**: files, directories or inline text are split into chunks,
//!   embedded in one batch and appended to a session's vector index
//! - **Retrieve**: the question is embedded and the top-k chunks are found by
//!   exact cosine similarity
//! - **Answer**: the retrieved chunks are sent to a language model that is told
//!   to answer from that context only
//!
//! Sessions are in-memory and live for the lifetime of the process.
//!
//! ## Example
//!
//! ```rust,ignore
//! use docqa_rag::{config::RagConfig, pipeline::RagPipeline, types::DocumentReference};
//!
//! let pipeline = RagPipeline::from_config(&RagConfig::load(None)?)?;
//! pipeline
//!     .ingest("demo", &[DocumentReference::content("The sky is blue.")])
//!     .await?;
//! let answer = pipeline.query("demo", "What color is the sky?", None).await?;
//! println!("{}", answer.answer);
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::RagPipeline;
pub use server::RagServer;
pub use session::SessionStore;
