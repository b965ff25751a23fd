//! docqa: document question answering over uploaded files
//!
//! Uploaded PDF, DOCX, PPTX, CSV and XLSX files are fingerprinted, extracted,
//! chunked and embedded into a per-version corpus. Questions are expanded into
//! paraphrases, answered from the merged retrieval results of the most recently
//! uploaded document, and served over a small axum HTTP API.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{DocumentPipeline, IngestOutcome};
pub use types::{Chunk, ChunkSource, ContentHash, Document, FileType, TextUnit};
