//! Upload and question orchestration
//!
//! Upload: persist → fingerprint → registry lookup → (reuse | extract → chunk
//! → build → commit). Question: active corpus snapshot → answering engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{Answer, AnswerEngine};
use crate::ingestion::extractor::run_blocking;
use crate::ingestion::{hash_file, ExtractorRegistry, RecursiveChunker};
use crate::providers::{
    CallPolicy, EmbeddingProvider, InMemoryVectorIndex, LlmProvider, OllamaClient, OllamaEmbedder,
    OllamaLlm, PolicyEmbedder, PolicyLlm, VectorIndexProvider,
};
use crate::registry::{DocumentRegistry, DocumentState};
use crate::retrieval::{MultiQueryRetriever, VectorStoreManager};
use crate::types::{Chunk, ContentHash, Document, FileType};

/// Error text returned when a question is missing
pub const MISSING_QUESTION: &str = "Ask a question";

/// What an upload did to the registry
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// First version of this name
    Created(Document),
    /// Content changed; a new corpus replaced the old one
    Replaced {
        document: Document,
        previous: ContentHash,
    },
    /// Identical content; the stored corpus was reused
    Reused(Document),
}

impl IngestOutcome {
    pub fn document(&self) -> &Document {
        match self {
            Self::Created(document) | Self::Reused(document) => document,
            Self::Replaced { document, .. } => document,
        }
    }

    /// Whether a new corpus was built
    pub fn built(&self) -> bool {
        !matches!(self, Self::Reused(_))
    }
}

/// Document Q&A pipeline shared by all requests
pub struct DocumentPipeline {
    registry: Arc<DocumentRegistry>,
    extractors: ExtractorRegistry,
    chunker: RecursiveChunker,
    store: Arc<VectorStoreManager>,
    engine: AnswerEngine,
    upload_dir: PathBuf,
}

impl DocumentPipeline {
    /// Assemble a pipeline from explicit providers
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndexProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker =
            RecursiveChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let store = Arc::new(VectorStoreManager::new(
            embedder,
            index,
            config.embeddings.batch_size,
        ));
        let retriever = MultiQueryRetriever::new(Arc::clone(&store), config.retrieval.top_k);
        let engine = AnswerEngine::new(llm, retriever, config.retrieval.paraphrase_count);

        Ok(Self {
            registry: Arc::new(DocumentRegistry::new()),
            extractors: ExtractorRegistry::with_defaults(&config.extraction),
            chunker,
            store,
            engine,
            upload_dir: config.server.upload_dir.clone(),
        })
    }

    /// Pipeline backed by Ollama and the in-memory index, every model call
    /// under the configured timeout and retry policy
    pub fn with_ollama(config: &RagConfig, client: Arc<OllamaClient>) -> Result<Self> {
        let policy = CallPolicy::from_config(&config.llm);
        let embedder = Arc::new(PolicyEmbedder::new(
            Arc::new(OllamaEmbedder::new(Arc::clone(&client), &config.embeddings)),
            policy.clone(),
        ));
        let llm = Arc::new(PolicyLlm::new(
            Arc::new(OllamaLlm::new(client, &config.llm)),
            policy,
        ));

        Self::new(config, embedder, llm, Arc::new(InMemoryVectorIndex::new()))
    }

    pub fn extractors_mut(&mut self) -> &mut ExtractorRegistry {
        &mut self.extractors
    }

    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<VectorStoreManager> {
        &self.store
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Persist uploaded bytes under their base filename and ingest them
    pub async fn ingest_upload(&self, filename: &str, data: &[u8]) -> Result<IngestOutcome> {
        let name = base_name(filename)?;
        // reject before touching disk
        self.extractors.resolve(Path::new(&name))?;

        let outcome = {
            let _guard = self.registry.lock(&name).await;
            self.save_and_ingest(&name, data).await
        };
        if outcome.is_err() {
            self.registry.release_lock(&name);
        }
        outcome
    }

    async fn save_and_ingest(&self, name: &str, data: &[u8]) -> Result<IngestOutcome> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(name);
        tokio::fs::write(&path, data).await?;
        tracing::info!("Saved upload '{}' ({} bytes)", name, data.len());

        self.ingest_locked(&path, name).await
    }

    /// Ingest a file already on disk, registered under `name`
    pub async fn ingest_path(&self, path: &Path, name: &str) -> Result<IngestOutcome> {
        let outcome = {
            let _guard = self.registry.lock(name).await;
            self.ingest_locked(path, name).await
        };
        if outcome.is_err() {
            self.registry.release_lock(name);
        }
        outcome
    }

    async fn ingest_locked(&self, path: &Path, name: &str) -> Result<IngestOutcome> {
        let (file_type, _) = self.extractors.resolve(path)?;

        let fingerprint = {
            let path = path.to_path_buf();
            run_blocking(move || hash_file(&path)).await?
        };

        let state = self.registry.state_of(name, &fingerprint);
        tracing::debug!("'{}' ({}) is {:?}", name, fingerprint.short(), state);

        if state == DocumentState::Current {
            if let Some(entry) = self.registry.get(name) {
                self.registry.activate(name);
                tracing::info!(
                    "'{}' unchanged, reusing corpus {}",
                    name,
                    entry.corpus.collection()
                );
                return Ok(IngestOutcome::Reused(entry.document));
            }
        }

        let (document, chunks) = self.process(path, name, file_type, fingerprint).await?;
        let corpus = self.store.build(name, &chunks).await?;

        match self.registry.commit(document.clone(), corpus) {
            Some(previous) => {
                tracing::info!(
                    "'{}' changed ({} -> {}), corpus replaced",
                    name,
                    previous.document.fingerprint.short(),
                    document.fingerprint.short()
                );
                Ok(IngestOutcome::Replaced {
                    document,
                    previous: previous.document.fingerprint,
                })
            }
            None => {
                tracing::info!("'{}' processed: {} chunks", name, document.total_chunks);
                Ok(IngestOutcome::Created(document))
            }
        }
    }

    /// Extract and chunk a document; the registry is not touched
    async fn process(
        &self,
        path: &Path,
        name: &str,
        file_type: FileType,
        fingerprint: ContentHash,
    ) -> Result<(Document, Vec<Chunk>)> {
        let file_size = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::read(path.display().to_string(), e))?
            .len();

        let units = self.extractors.extract(path, name).await?;
        let chunks = self.chunker.chunk_units(&units);
        if chunks.is_empty() {
            return Err(Error::extraction(name, "No text content could be extracted"));
        }

        let mut document = Document::new(name.to_string(), fingerprint, file_type, file_size);
        document.total_units = units.len() as u32;
        document.total_chunks = chunks.len() as u32;
        Ok((document, chunks))
    }

    /// Answer a question against the most recently uploaded document
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::MissingInput(MISSING_QUESTION.to_string()));
        }

        let active = self.registry.active().ok_or(Error::NoCorpus)?;
        tracing::info!("Answering against '{}'", active.filename);
        self.engine.answer(&active.corpus, question).await
    }
}

/// Final path component of an uploaded filename
fn base_name(filename: &str) -> Result<String> {
    let normalized = filename.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::MissingInput("No file provided".to_string()))
}

/// Check that Ollama is reachable and optionally pull the embedding model
pub async fn prepare_ollama(client: &OllamaClient, config: &RagConfig) -> Result<bool> {
    let healthy = tokio::time::timeout(Duration::from_secs(5), client.health_check())
        .await
        .unwrap_or(Ok(false))?;
    if !healthy {
        return Ok(false);
    }

    if config.llm.pull_models {
        let installed = client.list_models().await.unwrap_or_default();
        let model = &config.embeddings.model;
        if !installed.iter().any(|m| m == model || m.starts_with(&format!("{}:", model))) {
            tracing::info!("Pulling embedding model {}", model);
            client.pull_model(model).await?;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(base_name("../../etc/report.pdf").unwrap(), "report.pdf");
        assert_eq!(base_name("C:\\Users\\me\\deck.pptx").unwrap(), "deck.pptx");
        assert!(matches!(base_name(""), Err(Error::MissingInput(_))));
        assert!(matches!(base_name("   "), Err(Error::MissingInput(_))));
    }
}
