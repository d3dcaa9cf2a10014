//! In-memory [`VectorStore`] implementation.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over all stored vectors, which is plenty
//! for a schema's worth of fragments.

use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{Fragment, IndexEntry, ScoredFragment};

use super::VectorStore;

/// In-memory vector index. One per session pipeline.
pub struct InMemoryStore {
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    fn poisoned() -> Error {
        Error::Search("vector index lock poisoned".to_string())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn replace_all(&self, items: Vec<(Vec<f32>, Fragment)>) -> Result<Vec<String>> {
        if let Some((first, _)) = items.first() {
            let dims = first.len();
            if dims == 0 {
                return Err(Error::Search("cannot index zero-length vectors".to_string()));
            }
            if let Some((bad, _)) = items.iter().find(|(v, _)| v.len() != dims) {
                return Err(Error::Search(format!(
                    "inconsistent vector dimensions: expected {}, got {}",
                    dims,
                    bad.len()
                )));
            }
        }

        let fresh: Vec<IndexEntry> = items
            .into_iter()
            .map(|(vector, fragment)| IndexEntry {
                id: Uuid::new_v4().to_string(),
                vector,
                fragment,
            })
            .collect();
        let ids = fresh.iter().map(|e| e.id.clone()).collect();

        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        *entries = fresh;
        Ok(ids)
    }

    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredFragment>> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let Some(first) = entries.first() else {
            return Ok(Vec::new());
        };
        if first.vector.len() != query_vec.len() {
            return Err(Error::Search(format!(
                "query vector has {} dimensions, index has {}",
                query_vec.len(),
                first.vector.len()
            )));
        }

        let mut candidates: Vec<ScoredFragment> = entries
            .iter()
            .map(|e| ScoredFragment {
                fragment: e.fragment.clone(),
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();
        // Stable sort: equal scores stay in insertion order.
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(k);
        Ok(candidates)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(|_| Self::poisoned())?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableMetadata;

    fn frag(text: &str) -> Fragment {
        Fragment {
            text: text.to_string(),
            start_index: 0,
            document_index: 0,
            metadata: TableMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let store = InMemoryStore::new();
        assert!(store.is_empty().await.unwrap());
        let hits = store.search(&[1.0, 0.0], 4).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = InMemoryStore::new();
        store
            .replace_all(vec![
                (vec![0.0, 1.0], frag("customers")),
                (vec![1.0, 0.0], frag("orders")),
                (vec![0.7, 0.7], frag("order_items")),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].fragment.text, "orders");
        assert_eq!(hits[1].fragment.text, "order_items");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = InMemoryStore::new();
        store
            .replace_all(vec![
                (vec![1.0, 0.0], frag("first")),
                (vec![2.0, 0.0], frag("second")),
                (vec![3.0, 0.0], frag("third")),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 3).await.unwrap();
        let order: Vec<&str> = hits.iter().map(|h| h.fragment.text.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_replace_discards_previous_corpus() {
        let store = InMemoryStore::new();
        let first = store
            .replace_all(vec![(vec![1.0], frag("old")), (vec![1.0], frag("older"))])
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_ne!(first[0], first[1]);

        store.replace_all(vec![(vec![1.0], frag("new"))]).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
        let hits = store.search(&[1.0], 4).await.unwrap();
        assert_eq!(hits[0].fragment.text, "new");
    }

    #[tokio::test]
    async fn test_inconsistent_dims_rejected_and_contents_kept() {
        let store = InMemoryStore::new();
        store.replace_all(vec![(vec![1.0, 0.0], frag("kept"))]).await.unwrap();

        let err = store
            .replace_all(vec![(vec![1.0, 0.0], frag("a")), (vec![1.0], frag("b"))])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Search(_)));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let store = InMemoryStore::new();
        store.replace_all(vec![(vec![1.0, 0.0], frag("x"))]).await.unwrap();
        let err = store.search(&[1.0, 0.0, 0.0], 4).await.unwrap_err();
        assert!(matches!(err, Error::Search(_)));
    }
}
