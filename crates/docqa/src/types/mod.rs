//! Core types for the document Q&A system

pub mod document;
pub mod response;

pub use document::{Chunk, ChunkSource, ContentHash, Document, FileType, TextUnit};
pub use response::{AnswerResponse, UploadResponse};
