//! Extractor capability and the registry that dispatches on file type

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::{FileType, TextUnit};

use super::formats::{DocxExtractor, PdfExtractor, PptxExtractor, TabularExtractor};
use super::unstructured::UnstructuredClient;

/// Converts one file into plain-text units
#[async_trait]
pub trait Extractor: Send + Sync {
    /// File types this extractor handles
    fn file_types(&self) -> &[FileType];

    /// Extract text from `path`; `filename` is the name recorded in chunk sources
    async fn extract(&self, path: &Path, filename: &str) -> Result<Vec<TextUnit>>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// Registry of extractors keyed by file type
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<FileType, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in PDF, DOCX, PPTX and CSV/XLSX extractors
    pub fn with_defaults(config: &ExtractionConfig) -> Self {
        let pdf = match &config.unstructured_url {
            Some(url) => PdfExtractor::with_partition_api(UnstructuredClient::new(
                url.clone(),
                config.unstructured_api_key.clone(),
            )),
            None => PdfExtractor::new(),
        };

        let mut registry = Self::new();
        registry.register(pdf);
        registry.register(DocxExtractor);
        registry.register(PptxExtractor);
        registry.register(TabularExtractor);
        registry
    }

    /// Register an extractor for every type it declares, replacing earlier ones
    pub fn register<E: Extractor + 'static>(&mut self, extractor: E) {
        let extractor: Arc<dyn Extractor> = Arc::new(extractor);
        for file_type in extractor.file_types() {
            self.extractors.insert(*file_type, Arc::clone(&extractor));
        }
    }

    /// Look up the extractor for a file type
    pub fn get(&self, file_type: FileType) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(&file_type).cloned()
    }

    /// Resolve the extractor for a path, failing on unknown extensions
    pub fn resolve(&self, path: &Path) -> Result<(FileType, Arc<dyn Extractor>)> {
        FileType::from_path(path)
            .and_then(|file_type| self.get(file_type).map(|e| (file_type, e)))
            .ok_or_else(|| Error::UnsupportedFormat(FileType::extension_of(path)))
    }

    /// Extract text units from a file
    pub async fn extract(&self, path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
        let (file_type, extractor) = self.resolve(path)?;
        tracing::debug!(
            "Extracting '{}' as {} with {}",
            filename,
            file_type.display_name(),
            extractor.name()
        );
        extractor.extract(path, filename).await
    }
}

/// Run a synchronous parser on the blocking pool
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkSource;

    struct FixedExtractor;

    #[async_trait]
    impl Extractor for FixedExtractor {
        fn file_types(&self) -> &[FileType] {
            &[FileType::Pdf]
        }

        async fn extract(&self, _path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
            Ok(vec![TextUnit::new(
                "fixed".to_string(),
                ChunkSource::page(filename, 1),
            )])
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_defaults_cover_all_formats() {
        let registry = ExtractorRegistry::with_defaults(&ExtractionConfig::default());
        for file_type in [
            FileType::Pdf,
            FileType::Docx,
            FileType::Pptx,
            FileType::Csv,
            FileType::Xlsx,
        ] {
            assert!(registry.get(file_type).is_some(), "{:?} missing", file_type);
        }
    }

    #[test]
    fn test_unknown_extension_names_extension() {
        let registry = ExtractorRegistry::with_defaults(&ExtractionConfig::default());
        match registry.resolve(Path::new("temp/notes.txt")) {
            Err(Error::UnsupportedFormat(ext)) => assert_eq!(ext, ".txt"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("txt should be unsupported"),
        }
    }

    #[test]
    fn test_empty_registry_rejects_known_types() {
        let registry = ExtractorRegistry::new();
        assert!(matches!(
            registry.resolve(Path::new("a.pdf")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_register_overrides_default() {
        let mut registry = ExtractorRegistry::with_defaults(&ExtractionConfig::default());
        registry.register(FixedExtractor);

        let units = registry
            .extract(Path::new("missing.pdf"), "missing.pdf")
            .await
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].content, "fixed");
    }

    #[tokio::test]
    async fn test_parser_panic_becomes_internal_error() {
        let result: Result<Vec<TextUnit>> = run_blocking(|| panic!("bad font encoding")).await;
        assert!(matches!(result, Err(Error::Internal(_))));

        // the runtime keeps serving after the panic
        let units = run_blocking(|| Ok(vec![1u8])).await.unwrap();
        assert_eq!(units, vec![1]);
    }
}
