//! Document ingestion: fingerprinting, text extraction and chunking

pub mod chunker;
pub mod extractor;
pub mod formats;
pub mod hasher;
pub mod unstructured;

pub use chunker::RecursiveChunker;
pub use extractor::{Extractor, ExtractorRegistry};
pub use formats::{DocxExtractor, PdfExtractor, PptxExtractor, TabularExtractor};
pub use hasher::{hash_bytes, hash_file, hash_reader};
pub use unstructured::UnstructuredClient;
