//! Corpus construction and similarity search over a vector index

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, IndexEntry, VectorIndexProvider};
use crate::types::Chunk;

/// Prefix of every collection created for a corpus
pub const COLLECTION_PREFIX: &str = "docqa";

/// One document version's chunks in a private index collection
///
/// Immutable once built. The collection is released when the last `Arc`
/// handle goes away, so readers holding a handle keep searching the version
/// they started with.
pub struct Corpus {
    collection: String,
    document: String,
    chunk_count: usize,
    index: Arc<dyn VectorIndexProvider>,
}

impl Corpus {
    /// Collection name in the vector index
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Document the corpus was built from
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }
}

impl std::fmt::Debug for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Corpus")
            .field("collection", &self.collection)
            .field("document", &self.document)
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

impl Drop for Corpus {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime to release collection {}", self.collection);
            return;
        };

        let index = Arc::clone(&self.index);
        let collection = std::mem::take(&mut self.collection);
        runtime.spawn(async move {
            match index.drop_collection(&collection).await {
                Ok(()) => tracing::debug!("Released collection {}", collection),
                Err(e) => tracing::warn!("Failed to release collection {}: {}", collection, e),
            }
        });
    }
}

/// A chunk returned by search, with its store-assigned identity
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Identifier unique within the corpus
    pub chunk_id: u64,
    pub chunk: Chunk,
    /// Similarity score (higher is more similar)
    pub similarity: f32,
}

/// Builds corpora from chunks and searches them
pub struct VectorStoreManager {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    batch_size: usize,
    builds: AtomicU64,
}

impl VectorStoreManager {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            batch_size: batch_size.max(1),
            builds: AtomicU64::new(0),
        }
    }

    /// Number of corpora built so far
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Embed every chunk and store it in a fresh collection
    ///
    /// All or nothing: on failure no collection is left behind.
    pub async fn build(&self, document: &str, chunks: &[Chunk]) -> Result<Arc<Corpus>> {
        let start = Instant::now();

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(as_embedding_error)?;
            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.extend(vectors);
        }
        let embed_ms = start.elapsed().as_millis();

        let collection = format!("{}-{}", COLLECTION_PREFIX, Uuid::new_v4());
        self.index
            .create_collection(&collection, self.embedder.dimensions())
            .await
            .map_err(as_retrieval_error)?;

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| IndexEntry {
                id: i as u64,
                embedding,
                chunk: chunk.clone(),
            })
            .collect();

        if let Err(e) = self.index.insert(&collection, entries).await {
            if let Err(drop_err) = self.index.drop_collection(&collection).await {
                tracing::warn!("Failed to drop partial collection {}: {}", collection, drop_err);
            }
            return Err(as_retrieval_error(e));
        }

        self.builds.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "Built corpus {} for '{}': {} chunks (embedding {}ms, total {}ms)",
            collection,
            document,
            chunks.len(),
            embed_ms,
            start.elapsed().as_millis()
        );

        Ok(Arc::new(Corpus {
            collection,
            document: document.to_string(),
            chunk_count: chunks.len(),
            index: Arc::clone(&self.index),
        }))
    }

    /// The `k` chunks most similar to `query`, most similar first
    pub async fn search(&self, corpus: &Corpus, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let embedding = self.embedder.embed(query).await.map_err(as_embedding_error)?;

        let hits = self
            .index
            .search(corpus.collection(), &embedding, k)
            .await
            .map_err(as_retrieval_error)?;

        Ok(hits
            .into_iter()
            .map(|hit| ScoredChunk {
                chunk_id: hit.id,
                chunk: hit.chunk,
                similarity: hit.similarity,
            })
            .collect())
    }
}

fn as_embedding_error(e: Error) -> Error {
    match e {
        Error::Embedding(_) | Error::Timeout { .. } => e,
        other => Error::embedding(other.to_string()),
    }
}

fn as_retrieval_error(e: Error) -> Error {
    match e {
        Error::Retrieval(_) | Error::Timeout { .. } => e,
        other => Error::retrieval(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::InMemoryVectorIndex;
    use crate::types::{ChunkSource, FileType};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Embeds text as letter frequencies of a, b and c
    struct LetterEmbedder {
        batches: AtomicUsize,
        fail: bool,
    }

    impl LetterEmbedder {
        fn new() -> Self {
            Self {
                batches: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(Error::embedding("model offline"));
            }
            Ok(['a', 'b', 'c']
                .iter()
                .map(|l| text.chars().filter(|c| c == l).count() as f32)
                .collect())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "letters"
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Chunk::new(t.to_string(), ChunkSource::new("t.csv", FileType::Csv), i as u32)
            })
            .collect()
    }

    async fn settle(index: &InMemoryVectorIndex, expected: usize) {
        for _ in 0..20 {
            if index.collection_count() == expected {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_build_batches_and_searches() {
        let embedder = Arc::new(LetterEmbedder::new());
        let index = Arc::new(InMemoryVectorIndex::new());
        let store = VectorStoreManager::new(embedder.clone(), index.clone(), 2);

        let corpus = store
            .build("t.csv", &chunks(&["aaaa", "bbbb", "cccc", "abab", "ccca"]))
            .await
            .unwrap();

        assert_eq!(embedder.batches.load(Ordering::SeqCst), 3);
        assert_eq!(store.builds(), 1);
        assert_eq!(corpus.chunk_count(), 5);
        assert!(corpus.collection().starts_with("docqa-"));
        assert_eq!(index.entry_count(corpus.collection()), Some(5));

        let hits = store.search(&corpus, "cc", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.content, "cccc");
        assert_eq!(hits[0].chunk_id, 2);
        assert_eq!(hits[1].chunk.content, "ccca");
    }

    #[tokio::test]
    async fn test_embedding_failure_creates_nothing() {
        let embedder = Arc::new(LetterEmbedder {
            batches: AtomicUsize::new(0),
            fail: true,
        });
        let index = Arc::new(InMemoryVectorIndex::new());
        let store = VectorStoreManager::new(embedder, index.clone(), 8);

        let result = store.build("t.csv", &chunks(&["aaaa"])).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
        assert_eq!(index.collection_count(), 0);
        assert_eq!(store.builds(), 0);
    }

    #[tokio::test]
    async fn test_each_build_gets_its_own_collection() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let store = VectorStoreManager::new(Arc::new(LetterEmbedder::new()), index.clone(), 8);

        let first = store.build("t.csv", &chunks(&["aaaa"])).await.unwrap();
        let second = store.build("t.csv", &chunks(&["aaaa"])).await.unwrap();
        assert_ne!(first.collection(), second.collection());
        assert_eq!(index.collection_count(), 2);
    }

    #[tokio::test]
    async fn test_last_handle_releases_collection() {
        let index = Arc::new(InMemoryVectorIndex::new());
        let store = VectorStoreManager::new(Arc::new(LetterEmbedder::new()), index.clone(), 8);

        let corpus = store.build("t.csv", &chunks(&["abc"])).await.unwrap();
        let reader = Arc::clone(&corpus);
        drop(corpus);
        settle(&index, 0).await;
        assert_eq!(index.collection_count(), 1, "reader still holds the corpus");
        assert_eq!(store.search(&reader, "a", 1).await.unwrap().len(), 1);

        drop(reader);
        settle(&index, 0).await;
        assert_eq!(index.collection_count(), 0);
    }
}
