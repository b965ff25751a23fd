//! Multi-query retrieval: search several phrasings, merge unique chunks

use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;

use super::store::{Corpus, ScoredChunk, VectorStoreManager};

/// Split model output into alternative questions, one per non-blank line
pub fn parse_paraphrases(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Set union of per-query results keyed on chunk id, in first-seen order
pub fn merge_unique(results: Vec<Vec<ScoredChunk>>) -> Vec<ScoredChunk> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .flatten()
        .filter(|hit| seen.insert(hit.chunk_id))
        .collect()
}

/// Runs every query against one corpus concurrently
pub struct MultiQueryRetriever {
    store: Arc<VectorStoreManager>,
    top_k: usize,
}

impl MultiQueryRetriever {
    pub fn new(store: Arc<VectorStoreManager>, top_k: usize) -> Self {
        Self { store, top_k }
    }

    /// Unique chunks matching any of `queries`
    pub async fn retrieve(&self, corpus: &Corpus, queries: &[String]) -> Result<Vec<ScoredChunk>> {
        let searches = queries
            .iter()
            .map(|query| self.store.search(corpus, query, self.top_k));
        let results = try_join_all(searches).await?;

        let total: usize = results.iter().map(Vec::len).sum();
        let merged = merge_unique(results);
        tracing::debug!(
            "{} queries returned {} hits, {} unique",
            queries.len(),
            total,
            merged.len()
        );
        Ok(merged)
    }
}
