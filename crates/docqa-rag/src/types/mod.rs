//! Core types for the document Q&A system

pub mod chunk;
pub mod request;
pub mod response;

pub use chunk::{Chunk, FileType, Vector};
pub use request::{DocumentReference, DocumentReferenceBody, IngestRequest, QueryRequest};
pub use response::{
    AnswerResult, IngestOutcome, IngestResponse, QueryResponse, RetrievalResult, SearchResult,
    SkippedSource,
};
