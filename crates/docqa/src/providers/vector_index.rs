//! Vector index provider trait for named collections of embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Chunk;

/// An entry written into a collection
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Identifier assigned by the caller, unique within the collection
    pub id: u64,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Chunk the embedding was computed from
    pub chunk: Chunk,
}

/// Search hit from a collection
#[derive(Debug, Clone)]
pub struct IndexHit {
    /// Entry identifier
    pub id: u64,
    /// The matched chunk
    pub chunk: Chunk,
    /// Similarity score (higher is more similar)
    pub similarity: f32,
}

/// Trait for storing embeddings and running nearest-neighbour search
///
/// Collections are created once, filled, then only read until dropped.
///
/// Implementations:
/// - `InMemoryVectorIndex`: brute-force cosine similarity
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Create an empty collection; fails if the name is taken
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert entries into an existing collection
    async fn insert(&self, collection: &str, entries: Vec<IndexEntry>) -> Result<()>;

    /// Up to `top_k` entries most similar to `query`, most similar first
    async fn search(&self, collection: &str, query: &[f32], top_k: usize) -> Result<Vec<IndexHit>>;

    /// Release a collection; unknown names are ignored
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
