//! Session store: one vector index per caller-chosen session id
//!
//! Sessions live for the lifetime of the store and are never evicted, so
//! memory grows with every session and every ingest. That is a known resource
//! limit of an in-memory, non-persistent deployment.

use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::retrieval::VectorIndex;
use crate::types::RetrievalResult;

/// Shared handle to one session's index.
///
/// Appends take the write lock for the duration of one batch, so concurrent
/// ingests into the same session serialize and no entries are lost. Searches
/// take the read lock and see a consistent prefix of the entries.
#[derive(Debug, Default)]
pub struct SessionIndex {
    index: RwLock<VectorIndex>,
}

impl SessionIndex {
    /// Wrap an already built index
    pub fn new(index: VectorIndex) -> Self {
        Self {
            index: RwLock::new(index),
        }
    }

    /// Append every entry of `batch`; all-or-nothing
    pub fn append(&self, batch: VectorIndex) -> Result<usize> {
        self.index.write().append(batch)
    }

    /// Top-k search
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        self.index.read().search(query, k)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Dimensionality of the stored vectors
    pub fn dimensions(&self) -> Option<usize> {
        self.index.read().dimensions()
    }
}

/// Summary of a session for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionSummary {
    /// Session id
    pub session_id: String,
    /// Entries in the session's index
    pub entries: usize,
    /// Vector dimensionality
    pub dimensions: Option<usize>,
}

/// Maps session ids to their indexes
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionIndex>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session's index, creating an empty one if absent
    pub fn create_or_get(&self, session_id: &str) -> Arc<SessionIndex> {
        if let Some(existing) = self.sessions.get(session_id) {
            return Arc::clone(existing.value());
        }

        let entry = self.sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::info!("Created session '{}'", session_id);
            Arc::new(SessionIndex::default())
        });
        Arc::clone(entry.value())
    }

    /// Append `batch` to the session, creating the session from it if absent.
    ///
    /// A new session is published with its entries already in place, so a
    /// concurrent reader sees either `SessionNotFound` or a populated index.
    /// An empty batch never creates a session.
    pub fn append(&self, session_id: &str, batch: VectorIndex) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let existing = match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let added = batch.len();
                entry.insert(Arc::new(SessionIndex::new(batch)));
                tracing::info!("Created session '{}'", session_id);
                return Ok(added);
            }
        };

        // The map shard is unlocked here; only the session's own lock is held
        existing.append(batch)
    }

    /// Return the session's index
    pub fn get(&self, session_id: &str) -> Result<Arc<SessionIndex>> {
        self.sessions
            .get(session_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// Check if a session exists
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if there are no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Summaries of every session, sorted by id
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|entry| SessionSummary {
                session_id: entry.key().clone(),
                entries: entry.value().len(),
                dimensions: entry.value().dimensions(),
            })
            .collect();
        summaries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn batch(vectors: &[[f32; 2]]) -> VectorIndex {
        VectorIndex::from_entries(
            vectors
                .iter()
                .enumerate()
                .map(|(i, v)| (v.to_vec(), Chunk::new(format!("c{}", i), "t", i as u32, 0, 2))),
        )
        .unwrap()
    }

    #[test]
    fn test_get_unknown_session() {
        let store = SessionStore::new();
        assert!(matches!(store.get("nope"), Err(Error::SessionNotFound(_))));
        assert!(!store.contains("nope"));
    }

    #[test]
    fn test_create_or_get_is_idempotent() {
        let store = SessionStore::new();
        let a = store.create_or_get("s1");
        a.append(batch(&[[1.0, 0.0]])).unwrap();

        let b = store.create_or_get("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.create_or_get("a").append(batch(&[[1.0, 0.0]])).unwrap();
        store
            .create_or_get("b")
            .append(batch(&[[0.0, 1.0], [0.5, 0.5]]))
            .unwrap();

        let results = store.get("a").unwrap().search(&[0.0, 1.0], 10).unwrap();
        assert_eq!(results.len(), 1);

        let list = store.list();
        assert_eq!(list[0].session_id, "a");
        assert_eq!(list[0].entries, 1);
        assert_eq!(list[1].entries, 2);
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .create_or_get("shared")
                            .append(batch(&[[1.0, 0.0], [0.0, 1.0]]))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("shared").unwrap().len(), 8 * 25 * 2);
    }

    #[test]
    fn test_append_creates_then_extends() {
        let store = SessionStore::new();
        assert_eq!(store.append("s", VectorIndex::new()).unwrap(), 0);
        assert!(!store.contains("s"));

        assert_eq!(store.append("s", batch(&[[1.0, 0.0], [0.0, 1.0]])).unwrap(), 2);
        assert_eq!(store.append("s", batch(&[[0.5, 0.5]])).unwrap(), 1);
        assert_eq!(store.get("s").unwrap().len(), 3);
    }

    #[test]
    fn test_new_sessions_are_never_visible_empty() {
        let store = Arc::new(SessionStore::new());
        let ids: Vec<String> = (0..200).map(|i| format!("s{}", i)).collect();

        let writer = {
            let store = Arc::clone(&store);
            let ids = ids.clone();
            std::thread::spawn(move || {
                for id in &ids {
                    store.append(id, batch(&[[1.0, 0.0]])).unwrap();
                }
            })
        };

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    for id in &ids {
                        match store.get(id) {
                            Ok(session) => {
                                assert!(!session.is_empty(), "{} visible before its entries", id);
                                assert_eq!(session.search(&[1.0, 0.0], 1).unwrap().len(), 1);
                            }
                            Err(e) => assert!(matches!(e, Error::SessionNotFound(_))),
                        }
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(store.len(), 200);
    }
}
