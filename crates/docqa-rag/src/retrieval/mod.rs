//! In-memory vector index and similarity search

mod index;
mod similarity;

pub use index::{IndexEntry, VectorIndex};
pub use similarity::{cosine_similarity, dot, norm};
