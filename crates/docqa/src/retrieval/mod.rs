//! Vector storage per document version and multi-query retrieval

pub mod multi_query;
pub mod store;

pub use multi_query::{merge_unique, parse_paraphrases, MultiQueryRetriever};
pub use store::{Corpus, ScoredChunk, VectorStoreManager};
