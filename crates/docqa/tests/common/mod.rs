//! Shared test doubles: counting embedder, scripted model, plain-text PDF stub

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use docqa::config::RagConfig;
use docqa::ingestion::Extractor;
use docqa::providers::{EmbeddingProvider, InMemoryVectorIndex, LlmProvider};
use docqa::{ChunkSource, DocumentPipeline, Error, FileType, Result, TextUnit};

pub const TEST_DIM: usize = 26;

/// Embeds text as lowercase letter frequencies and counts calls
#[derive(Default)]
pub struct CountingEmbedder {
    pub batch_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    /// Fail every call while set
    pub failing: AtomicBool,
}

impl CountingEmbedder {
    pub fn batches(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::embedding("embedding model unavailable"));
        }
        Ok(())
    }

    fn letters(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; TEST_DIM];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(Self::letters(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(texts.iter().map(|t| Self::letters(t)).collect())
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }

    fn name(&self) -> &str {
        "counting"
    }
}

pub const PARAPHRASES: &str = "What does Alpha mean?\n\n  Define Alpha  \n";
pub const ANSWER: &str = "Alpha is the first word of the report.";

/// Returns fixed paraphrases for expansion prompts and a fixed answer
/// otherwise, recording every prompt
#[derive(Default)]
pub struct ScriptedLlm {
    pub prompts: Mutex<Vec<String>>,
    /// Fail every call while set
    pub failing: AtomicBool,
}

impl ScriptedLlm {
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::generation("language model unavailable"));
        }
        if prompt.contains("different versions of the user's question") {
            Ok(PARAPHRASES.to_string())
        } else {
            Ok(ANSWER.to_string())
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// Treats a ".pdf" file's bytes as UTF-8 text on page 1
pub struct PlainTextPdf;

#[async_trait]
impl Extractor for PlainTextPdf {
    fn file_types(&self) -> &[FileType] {
        &[FileType::Pdf]
    }

    async fn extract(&self, path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
        let text = tokio::fs::read_to_string(path).await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TextUnit::new(text, ChunkSource::page(filename, 1))])
    }

    fn name(&self) -> &str {
        "plain-text-pdf"
    }
}

pub struct Harness {
    pub pipeline: Arc<DocumentPipeline>,
    pub embedder: Arc<CountingEmbedder>,
    pub llm: Arc<ScriptedLlm>,
    pub index: Arc<InMemoryVectorIndex>,
    pub config: RagConfig,
    pub _dir: tempfile::TempDir,
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RagConfig::default();
    config.server.upload_dir = dir.path().join("temp");

    let embedder = Arc::new(CountingEmbedder::default());
    let llm = Arc::new(ScriptedLlm::default());
    let index = Arc::new(InMemoryVectorIndex::new());

    let mut pipeline =
        DocumentPipeline::new(&config, embedder.clone(), llm.clone(), index.clone()).unwrap();
    pipeline.extractors_mut().register(PlainTextPdf);

    Harness {
        pipeline: Arc::new(pipeline),
        embedder,
        llm,
        index,
        config,
        _dir: dir,
    }
}

/// Yield until the index holds `expected` collections
pub async fn settle(index: &InMemoryVectorIndex, expected: usize) {
    for _ in 0..50 {
        if index.collection_count() == expected {
            return;
        }
        tokio::task::yield_now().await;
    }
}
