//! In-memory vector index with brute-force cosine similarity

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Error, Result};

use super::vector_index::{IndexEntry, IndexHit, VectorIndexProvider};

struct Collection {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// Vector index keeping every collection in process memory
///
/// Collections live until dropped; nothing survives a restart.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    collections: DashMap<String, Collection>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live collections
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Number of entries in a collection, if it exists
    pub fn entry_count(&self, collection: &str) -> Option<usize> {
        self.collections.get(collection).map(|c| c.entries.len())
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndexProvider for InMemoryVectorIndex {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        match self.collections.entry(name.to_string()) {
            Entry::Occupied(_) => Err(Error::retrieval(format!(
                "Collection '{}' already exists",
                name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Collection {
                    dimensions,
                    entries: Vec::new(),
                });
                Ok(())
            }
        }
    }

    async fn insert(&self, collection: &str, entries: Vec<IndexEntry>) -> Result<()> {
        let mut target = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| Error::retrieval(format!("Unknown collection '{}'", collection)))?;

        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != target.dimensions) {
            return Err(Error::retrieval(format!(
                "Embedding for entry {} has {} dimensions, collection expects {}",
                bad.id,
                bad.embedding.len(),
                target.dimensions
            )));
        }

        target.entries.extend(entries);
        Ok(())
    }

    async fn search(&self, collection: &str, query: &[f32], top_k: usize) -> Result<Vec<IndexHit>> {
        let target = self
            .collections
            .get(collection)
            .ok_or_else(|| Error::retrieval(format!("Unknown collection '{}'", collection)))?;

        let mut scored: Vec<(f32, &IndexEntry)> = target
            .entries
            .iter()
            .map(|entry| (Self::cosine_similarity(query, &entry.embedding), entry))
            .collect();

        // Highest similarity first, ties broken by insertion id
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.id.cmp(&b.1.id))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(similarity, entry)| IndexHit {
                id: entry.id,
                chunk: entry.chunk.clone(),
                similarity,
            })
            .collect())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections.remove(name);
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
