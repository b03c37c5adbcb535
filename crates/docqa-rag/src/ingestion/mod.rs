//! Document ingestion: parsing, chunking and loading

mod chunker;
mod loader;
mod parser;

pub use chunker::{estimate_tokens, TextChunker, TextSpan, CHARS_PER_TOKEN};
pub use loader::{DocumentLoader, LoadReport};
pub use parser::{FileParser, PageContent, ParsedDocument};
