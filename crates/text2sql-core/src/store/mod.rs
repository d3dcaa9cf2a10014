//! Vector index abstraction.
//!
//! The [`VectorStore`] trait is the seam between the pipeline and the
//! similarity backend. The pipeline only ever replaces the whole corpus
//! (one schema upload = one corpus) and runs top-k searches against it.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Fragment, ScoredFragment};

/// Abstract similarity backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`replace_all`](VectorStore::replace_all) | Swap the indexed corpus for a new one |
/// | [`search`](VectorStore::search) | Top-k similarity search |
/// | [`len`](VectorStore::len) | Number of stored entries |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replace every stored entry with `items`, in one step.
    ///
    /// Returns the ids assigned to the new entries, in input order. On
    /// error the previous contents are kept.
    async fn replace_all(&self, items: Vec<(Vec<f32>, Fragment)>) -> Result<Vec<String>>;

    /// Return up to `k` fragments ordered by descending similarity to
    /// `query_vec`. Equal scores keep insertion order. An empty store
    /// returns an empty list.
    async fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredFragment>>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
