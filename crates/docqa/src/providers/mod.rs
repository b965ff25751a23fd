//! Provider abstractions for embeddings, text generation and vector search
//!
//! The pipeline only sees these traits; Ollama and the in-memory index are the
//! built-in implementations, and `policy` wraps any of them with a deadline
//! and retries.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod policy;
pub mod vector_index;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::InMemoryVectorIndex;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use policy::{CallPolicy, PolicyEmbedder, PolicyLlm};
pub use vector_index::{IndexEntry, IndexHit, VectorIndexProvider};
