//! Built-in extractors: PDF, DOCX, PPTX speaker notes, CSV/XLSX rows

use async_trait::async_trait;
use calamine::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{ChunkSource, FileType, TextUnit};

use super::extractor::{run_blocking, Extractor};
use super::unstructured::UnstructuredClient;

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::read(path.display().to_string(), e))
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

/// PDF extractor producing one unit per page
pub struct PdfExtractor {
    partition_api: Option<UnstructuredClient>,
}

impl PdfExtractor {
    /// Local extraction with lopdf, falling back to pdf-extract
    pub fn new() -> Self {
        Self { partition_api: None }
    }

    /// Delegate PDFs to a document partition API
    pub fn with_partition_api(client: UnstructuredClient) -> Self {
        Self {
            partition_api: Some(client),
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    fn file_types(&self) -> &[FileType] {
        &[FileType::Pdf]
    }

    async fn extract(&self, path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
        if let Some(client) = &self.partition_api {
            let data = tokio::fs::read(path)
                .await
                .map_err(|e| Error::read(path.display().to_string(), e))?;
            return client.partition(filename, data).await;
        }

        let path = path.to_path_buf();
        let filename = filename.to_string();
        run_blocking(move || extract_pdf(&path, &filename)).await
    }

    fn name(&self) -> &str {
        if self.partition_api.is_some() {
            "pdf-partition-api"
        } else {
            "pdf-local"
        }
    }
}

fn extract_pdf(path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
    let data = read_file(path)?;

    let mut units = Vec::new();
    match lopdf::Document::load_mem(&data) {
        Ok(doc) => {
            for page_number in doc.get_pages().keys() {
                match doc.extract_text(&[*page_number]) {
                    Ok(text) => {
                        let text = cleanup_pdf_text(&text);
                        if !text.is_empty() {
                            let source = ChunkSource::page(filename, *page_number);
                            units.push(TextUnit::new(text, source));
                        }
                    }
                    Err(e) => {
                        tracing::debug!("No text on page {} of '{}': {}", page_number, filename, e)
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!("lopdf could not load '{}': {}, trying pdf-extract", filename, e)
        }
    }

    if !units.is_empty() {
        return Ok(units);
    }

    let text = pdf_extract::extract_text_from_mem(&data)
        .map_err(|e| Error::extraction(filename, format!("Failed to load PDF: {}", e)))?;
    let text = cleanup_pdf_text(&text);
    if text.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![TextUnit::new(text, ChunkSource::new(filename, FileType::Pdf))])
}

/// Replace typographic glyphs that survive PDF text extraction, drop NULs and
/// blank lines
pub fn cleanup_pdf_text(text: &str) -> String {
    const REPLACEMENTS: &[(char, &str)] = &[
        ('\u{2010}', "-"),
        ('\u{2011}', "-"),
        ('\u{2013}', "-"),
        ('\u{2014}', "--"),
        ('\u{2018}', "'"),
        ('\u{2019}', "'"),
        ('\u{201C}', "\""),
        ('\u{201D}', "\""),
        ('\u{2022}', "* "),
        ('\u{2026}', "..."),
        ('\u{00A0}', " "),
        ('\u{FB00}', "ff"),
        ('\u{FB01}', "fi"),
        ('\u{FB02}', "fl"),
        ('\u{FB03}', "ffi"),
        ('\u{FB04}', "ffl"),
        ('\0', ""),
    ];

    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        match REPLACEMENTS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => cleaned.push_str(to),
            None => cleaned.push(ch),
        }
    }

    cleaned
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// DOCX
// ---------------------------------------------------------------------------

/// Word extractor: non-empty paragraphs, newline-joined
pub struct DocxExtractor;

#[async_trait]
impl Extractor for DocxExtractor {
    fn file_types(&self) -> &[FileType] {
        &[FileType::Docx]
    }

    async fn extract(&self, path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
        let path = path.to_path_buf();
        let filename = filename.to_string();
        run_blocking(move || extract_docx(&path, &filename)).await
    }

    fn name(&self) -> &str {
        "docx"
    }
}

fn extract_docx(path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
    let data = read_file(path)?;
    let doc = docx_rs::read_docx(&data).map_err(|e| Error::extraction(filename, e.to_string()))?;

    let paragraphs: Vec<String> = doc
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            docx_rs::DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    Ok(single_unit(paragraphs.join("\n"), ChunkSource::new(filename, FileType::Docx)))
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                match child {
                    docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => text.push('\t'),
                    docx_rs::RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

fn single_unit(content: String, source: ChunkSource) -> Vec<TextUnit> {
    if content.trim().is_empty() {
        Vec::new()
    } else {
        vec![TextUnit::new(content, source)]
    }
}

// ---------------------------------------------------------------------------
// PPTX
// ---------------------------------------------------------------------------

const SLIDE_PREFIX: &str = "ppt/slides/slide";
const NOTES_SLIDE_REL: &str = "/notesSlide";

/// PowerPoint extractor that indexes speaker notes only; slide body text is
/// not extracted
pub struct PptxExtractor;

#[async_trait]
impl Extractor for PptxExtractor {
    fn file_types(&self) -> &[FileType] {
        &[FileType::Pptx]
    }

    async fn extract(&self, path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
        let path = path.to_path_buf();
        let filename = filename.to_string();
        run_blocking(move || extract_pptx_notes(&path, &filename)).await
    }

    fn name(&self) -> &str {
        "pptx-notes"
    }
}

fn extract_pptx_notes(path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
    let file = std::fs::File::open(path).map_err(|e| Error::read(path.display().to_string(), e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| Error::extraction(filename, e.to_string()))?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter(|name| name.starts_with(SLIDE_PREFIX) && name.ends_with(".xml"))
        .filter_map(|name| {
            name.trim_start_matches(SLIDE_PREFIX)
                .trim_end_matches(".xml")
                .parse::<u32>()
                .ok()
                .map(|n| (n, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut notes = Vec::new();
    for (slide_number, slide_name) in slides {
        let rels_name = format!("ppt/slides/_rels/slide{}.xml.rels", slide_number);
        let Some(rels) = read_zip_entry(&mut archive, &rels_name, filename)? else {
            continue;
        };
        let Some(target) = notes_target(&rels) else {
            continue;
        };
        let notes_name = resolve_part(&slide_name, &target);
        let Some(notes_xml) = read_zip_entry(&mut archive, &notes_name, filename)? else {
            tracing::debug!("'{}' references missing notes part {}", filename, notes_name);
            continue;
        };

        let text = notes_body_text(&notes_xml).map_err(|e| Error::extraction(filename, e))?;
        let text = text.trim();
        if !text.is_empty() {
            notes.push(text.to_string());
        }
    }

    Ok(single_unit(notes.join("\n"), ChunkSource::new(filename, FileType::Pptx)))
}

fn read_zip_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
    filename: &str,
) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Error::extraction(filename, e.to_string())),
    };
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| Error::extraction(filename, format!("{}: {}", name, e)))?;
    Ok(Some(xml))
}

/// Target of the notesSlide relationship in a slide's .rels part
fn notes_target(rels_xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(rels_xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let rel_type = attribute(&e, b"Type").unwrap_or_default();
                if rel_type.ends_with(NOTES_SLIDE_REL) {
                    return attribute(&e, b"Target");
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Resolve a relationship target relative to the part that owns it
fn resolve_part(owner: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = owner.split('/').collect();
    parts.pop();
    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            other => parts.push(other),
        }
    }
    let resolved: PathBuf = parts.iter().collect();
    resolved.to_string_lossy().replace('\\', "/")
}

/// Text of the body placeholder of a notes slide, paragraphs newline-joined
fn notes_body_text(xml: &str) -> std::result::Result<String, String> {
    let mut reader = quick_xml::Reader::from_str(xml);

    let mut in_shape = false;
    let mut is_body = false;
    let mut in_text = false;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut bodies: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sp" => {
                    in_shape = true;
                    is_body = false;
                    paragraphs.clear();
                    current.clear();
                }
                b"ph" if in_shape => is_body = attribute(&e, b"type").as_deref() == Some("body"),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"ph" if in_shape => is_body = attribute(&e, b"type").as_deref() == Some("body"),
                b"br" if in_shape => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if in_shape => paragraphs.push(std::mem::take(&mut current)),
                b"sp" => {
                    if is_body {
                        bodies.push(paragraphs.join("\n"));
                    }
                    in_shape = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Malformed notes slide: {}", e)),
            _ => {}
        }
    }

    Ok(bodies.join("\n"))
}

// ---------------------------------------------------------------------------
// CSV / XLSX
// ---------------------------------------------------------------------------

/// Spreadsheet extractor: one line per row, cells joined with " | ", header
/// row included as-is
pub struct TabularExtractor;

const CELL_SEPARATOR: &str = " | ";

#[async_trait]
impl Extractor for TabularExtractor {
    fn file_types(&self) -> &[FileType] {
        &[FileType::Csv, FileType::Xlsx]
    }

    async fn extract(&self, path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
        let path = path.to_path_buf();
        let filename = filename.to_string();
        run_blocking(move || match FileType::from_path(&path) {
            Some(FileType::Xlsx) => extract_xlsx(&path, &filename),
            _ => extract_csv(&path, &filename),
        })
        .await
    }

    fn name(&self) -> &str {
        "tabular"
    }
}

fn extract_csv(path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::extraction(filename, e.to_string()))?;

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::extraction(filename, e.to_string()))?;
        lines.push(record.iter().collect::<Vec<_>>().join(CELL_SEPARATOR));
    }

    let mut source = ChunkSource::new(filename, FileType::Csv);
    source.row_range = row_range(lines.len());
    Ok(single_unit(lines.join("\n"), source))
}

fn extract_xlsx(path: &Path, filename: &str) -> Result<Vec<TextUnit>> {
    let mut workbook =
        calamine::open_workbook_auto(path).map_err(|e| Error::extraction(filename, e.to_string()))?;

    let sheet_name = workbook.sheet_names().first().cloned();
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| Error::extraction(filename, e.to_string()))?,
        None => return Ok(Vec::new()),
    };

    let lines: Vec<String> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>().join(CELL_SEPARATOR))
        .collect();

    let mut source = ChunkSource::new(filename, FileType::Xlsx);
    source.sheet_name = sheet_name;
    source.row_range = row_range(lines.len());
    Ok(single_unit(lines.join("\n"), source))
}

/// Stringify a spreadsheet cell; empty cells render as empty strings
pub fn cell_text(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_range(rows: usize) -> Option<(u32, u32)> {
    (rows > 0).then(|| (1, rows as u32))
}
