//! Exact nearest-neighbour index over (vector, chunk) entries
//!
//! Search is a linear scan: every stored vector is scored against the query.
//! Results are exact and there is no index-build step; the cost per query is
//! O(n * d) in the number of entries and the dimensionality.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::types::{Chunk, RetrievalResult, SearchResult, Vector};

use super::similarity::{dot, norm};

/// A stored vector with the chunk it was computed from
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Embedding of `chunk.text`
    pub vector: Vector,
    /// The chunk
    pub chunk: Chunk,
    /// Cached L2 norm of `vector`
    norm: f32,
}

impl IndexEntry {
    /// Create an entry
    pub fn new(vector: Vector, chunk: Chunk) -> Self {
        let norm = norm(&vector);
        Self {
            vector,
            chunk,
            norm,
        }
    }
}

/// Append-only collection of index entries sharing one dimensionality
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from (vector, chunk) pairs
    pub fn from_entries(entries: impl IntoIterator<Item = (Vector, Chunk)>) -> Result<Self> {
        let mut index = Self::new();
        index.insert(entries)?;
        Ok(index)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality fixed by the first inserted vector
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append entries. The whole batch is validated first, so on error the
    /// index is left untouched. No deduplication.
    pub fn insert(&mut self, entries: impl IntoIterator<Item = (Vector, Chunk)>) -> Result<usize> {
        let batch: Vec<IndexEntry> = entries
            .into_iter()
            .map(|(vector, chunk)| IndexEntry::new(vector, chunk))
            .collect();
        self.append_entries(batch)
    }

    /// Move every entry of `other` to the end of this index
    pub fn append(&mut self, other: VectorIndex) -> Result<usize> {
        self.append_entries(other.entries)
    }

    fn append_entries(&mut self, batch: Vec<IndexEntry>) -> Result<usize> {
        let Some(first) = batch.first() else {
            return Ok(0);
        };

        let expected = self.dimensions.unwrap_or(first.vector.len());
        if expected == 0 {
            return Err(Error::invalid("embedding vectors must not be empty"));
        }
        if let Some(bad) = batch.iter().find(|e| e.vector.len() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: bad.vector.len(),
            });
        }

        let added = batch.len();
        self.dimensions = Some(expected);
        self.entries.extend(batch);
        Ok(added)
    }

    /// Top-k entries by descending cosine similarity to `query`.
    ///
    /// Ties keep insertion order. `k` larger than the index returns every entry.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(Error::invalid("k must be at least 1"));
        }
        let Some(dimensions) = self.dimensions.filter(|_| !self.entries.is_empty()) else {
            return Err(Error::EmptyIndex);
        };
        if query.len() != dimensions {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                actual: query.len(),
            });
        }

        let query_norm = norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, similarity(query, query_norm, entry)))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| SearchResult {
                chunk: self.entries[i].chunk.clone(),
                similarity,
            })
            .collect())
    }
}

/// Cosine similarity using the entry's cached norm
fn similarity(query: &[f32], query_norm: f32, entry: &IndexEntry) -> f32 {
    if query_norm == 0.0 || entry.norm == 0.0 {
        return 0.0;
    }
    let score = dot(query, &entry.vector) / (query_norm * entry.norm);
    // NaN would break the ordering
    if score.is_nan() {
        0.0
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, i: u32) -> Chunk {
        Chunk::new(text, "test", i, 0, text.len())
    }

    fn sample() -> VectorIndex {
        VectorIndex::from_entries(vec![
            (vec![1.0, 0.0, 0.0], chunk("x", 0)),
            (vec![0.0, 1.0, 0.0], chunk("y", 1)),
            (vec![0.7, 0.7, 0.0], chunk("xy", 2)),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let index = sample();
        let results = index.search(&[0.0, 1.0, 0.0], 3).unwrap();
        assert_eq!(results[0].chunk.text, "y");
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
        assert_eq!(results[1].chunk.text, "xy");
        assert_eq!(results[2].chunk.text, "x");
    }

    #[test]
    fn test_k_larger_than_len_returns_all() {
        let index = sample();
        let results = index.search(&[1.0, 1.0, 1.0], 10).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_k_zero_rejected() {
        let err = sample().search(&[1.0, 0.0, 0.0], 0).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = VectorIndex::from_entries(vec![
            (vec![1.0, 0.0], chunk("first", 0)),
            (vec![2.0, 0.0], chunk("second", 1)),
            (vec![0.0, 1.0], chunk("other", 2)),
            (vec![3.0, 0.0], chunk("third", 3)),
        ])
        .unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_index() {
        let index = VectorIndex::new();
        assert!(matches!(index.search(&[1.0], 1), Err(Error::EmptyIndex)));
    }

    #[test]
    fn test_dimension_mismatch_leaves_index_untouched() {
        let mut index = sample();
        let err = index
            .insert(vec![
                (vec![1.0, 1.0, 1.0], chunk("ok", 3)),
                (vec![1.0, 1.0], chunk("bad", 4)),
            ])
            .unwrap_err();

        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimensions(), Some(3));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let err = sample().search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_append_merges_and_checks_dimensions() {
        let mut index = sample();
        let other = VectorIndex::from_entries(vec![(vec![0.0, 0.0, 1.0], chunk("z", 3))]).unwrap();
        assert_eq!(index.append(other).unwrap(), 1);
        assert_eq!(index.len(), 4);

        let wrong = VectorIndex::from_entries(vec![(vec![1.0], chunk("w", 0))]).unwrap();
        assert!(index.append(wrong).is_err());
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_empty_vector_rejected() {
        let mut index = VectorIndex::new();
        assert!(index.insert(vec![(Vec::new(), chunk("e", 0))]).is_err());
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), None);
    }
}
