//! Client for an Unstructured-compatible document partition API

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{ChunkSource, FileType, TextUnit};

const PARTITION_TIMEOUT: Duration = Duration::from_secs(120);

/// Sends PDFs to a partition endpoint and groups the returned elements by page
#[derive(Clone)]
pub struct UnstructuredClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(default)]
    text: String,
    metadata: Option<ElementMetadata>,
}

#[derive(Debug, Deserialize)]
struct ElementMetadata {
    page_number: Option<u32>,
}

impl UnstructuredClient {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            api_key,
        }
    }

    /// Partition a document into per-page text units
    pub async fn partition(&self, filename: &str, data: Vec<u8>) -> Result<Vec<TextUnit>> {
        let form = reqwest::multipart::Form::new().part(
            "files",
            reqwest::multipart::Part::bytes(data).file_name(filename.to_string()),
        );

        let mut request = self
            .client
            .post(&self.url)
            .timeout(PARTITION_TIMEOUT)
            .multipart(form);
        if let Some(api_key) = &self.api_key {
            request = request.header("unstructured-api-key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::extraction(filename, format!("Partition request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::extraction(
                filename,
                format!("Partition API error: {} - {}", status, body),
            ));
        }

        let elements: Vec<Element> = response.json().await.map_err(|e| {
            Error::extraction(filename, format!("Invalid partition response: {}", e))
        })?;

        tracing::debug!("Partition API returned {} elements for '{}'", elements.len(), filename);
        Ok(group_by_page(filename, elements))
    }
}

/// Join consecutive elements of the same page with blank lines
fn group_by_page(filename: &str, elements: Vec<Element>) -> Vec<TextUnit> {
    let mut units = Vec::new();
    let mut current_page = None;
    let mut content = String::new();

    for element in elements {
        let page = element.metadata.and_then(|m| m.page_number).unwrap_or(1);
        if current_page != Some(page) {
            flush_page(filename, current_page, &mut content, &mut units);
            current_page = Some(page);
        }

        let text = element.text.trim();
        if text.is_empty() {
            continue;
        }
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(text);
    }
    flush_page(filename, current_page, &mut content, &mut units);

    units
}

fn flush_page(filename: &str, page: Option<u32>, content: &mut String, units: &mut Vec<TextUnit>) {
    if content.is_empty() {
        return;
    }
    let source = match page {
        Some(page) => ChunkSource::page(filename, page),
        None => ChunkSource::new(filename, FileType::Pdf),
    };
    units.push(TextUnit::new(std::mem::take(content), source));
}
