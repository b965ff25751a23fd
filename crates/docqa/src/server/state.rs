//! Application state for the HTTP server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::pipeline::DocumentPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    pipeline: DocumentPipeline,
}

impl AppState {
    pub fn new(config: RagConfig, pipeline: DocumentPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.inner.pipeline
    }
}
