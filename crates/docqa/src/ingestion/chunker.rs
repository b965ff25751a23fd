//! Recursive character chunking with overlap

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::types::{Chunk, TextUnit};

/// Separators tried in order: paragraph, line, sentence, word, character
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Splits text on the coarsest separator that keeps pieces under the size
/// limit, then greedily merges pieces back into overlapping chunks.
///
/// Lengths are counted in characters, not bytes.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters carried from the end of one chunk into the next
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a chunker; the overlap may not exceed the chunk size
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk size must be positive".to_string()));
        }
        if chunk_overlap > chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) larger than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Chunk every unit, numbering chunks sequentially across the document
    pub fn chunk_units(&self, units: &[TextUnit]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for unit in units {
            for content in self.chunk_text(&unit.content) {
                let index = chunks.len() as u32;
                chunks.push(Chunk::new(content, unit.source.clone(), index));
            }
        }
        chunks
    }

    /// Split a single text into trimmed, non-empty chunks
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_pieces(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_pieces(&fitting));
        }
        chunks
    }

    /// Greedily concatenate pieces into chunks, carrying at most
    /// `chunk_overlap` characters of trailing pieces into the next chunk
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&window, &mut chunks);

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_joined(&window, &mut chunks);
        chunks
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            chunk_overlap: 300,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(window: &VecDeque<&str>, chunks: &mut Vec<String>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// First separator that occurs in `text`, plus the finer separators after it
fn pick_separator<'a>(
    text: &str,
    separators: &'a [&'static str],
) -> (&'static str, &'a [&'static str]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split so that each separator starts the piece that follows it; empty
/// pieces are dropped. An empty separator splits into characters.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, FileType};

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{:05}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_is_one_trimmed_chunk() {
        let chunker = RecursiveChunker::default();
        assert_eq!(chunker.chunk_text("  Alpha Beta Gamma \n"), vec!["Alpha Beta Gamma"]);
    }

    #[test]
    fn test_blank_text_produces_no_chunks() {
        let chunker = RecursiveChunker::default();
        assert!(chunker.chunk_text("").is_empty());
        assert!(chunker.chunk_text(" \n\n \n").is_empty());
    }

    #[test]
    fn test_overlap_larger_than_size_is_rejected() {
        assert!(matches!(RecursiveChunker::new(100, 200), Err(Error::Config(_))));
        assert!(matches!(RecursiveChunker::new(0, 0), Err(Error::Config(_))));
        assert!(RecursiveChunker::new(100, 100).is_ok());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let chunker = RecursiveChunker::new(1200, 300).unwrap();
        let text = numbered_words(1000);
        let chunks = chunker.chunk_text(&text);

        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1200, "chunk of {} chars", chunk.len());
        }

        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let first_word = next.split(' ').next().unwrap();
            let tail_start = prev.find(first_word).expect("next chunk starts inside previous");
            let carried = &prev[tail_start..];

            assert!(next.starts_with(carried));
            assert!(carried.len() <= 300);
            assert!(carried.len() >= 250, "carried only {} chars", carried.len());
        }
    }

    #[test]
    fn test_every_word_survives() {
        let chunker = RecursiveChunker::new(200, 50).unwrap();
        let text = numbered_words(300);
        let joined = chunker.chunk_text(&text).join(" ");
        for i in 0..300 {
            assert!(joined.contains(&format!("w{:05}", i)));
        }
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let chunker = RecursiveChunker::new(1200, 300).unwrap();
        let first = "a".repeat(800);
        let second = "b".repeat(800);
        let chunks = chunker.chunk_text(&format!("{}\n\n{}", first, second));

        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let chunker = RecursiveChunker::new(1200, 300).unwrap();
        let chunks = chunker.chunk_text(&"x".repeat(3000));

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 1200));
    }

    #[test]
    fn test_lengths_count_characters() {
        let chunker = RecursiveChunker::new(10, 0).unwrap();
        let chunks = chunker.chunk_text(&"é".repeat(25));
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_split_keeping_separator() {
        assert_eq!(
            split_keeping_separator("a\n\n\n\nb", "\n\n"),
            vec!["a", "\n\n", "\n\nb"]
        );
        assert_eq!(split_keeping_separator("one. two. ", ". "), vec!["one", ". two", ". "]);
        assert_eq!(split_keeping_separator("ab", ""), vec!["a", "b"]);
    }

    #[test]
    fn test_chunk_units_numbers_sequentially() {
        let chunker = RecursiveChunker::new(100, 20).unwrap();
        let units = vec![
            TextUnit::new(numbered_words(40), ChunkSource::page("r.pdf", 1)),
            TextUnit::new("last page".to_string(), ChunkSource::page("r.pdf", 2)),
        ];
        let chunks = chunker.chunk_units(&units);

        let indexes: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, (0..chunks.len() as u32).collect::<Vec<_>>());
        let last = chunks.last().unwrap();
        assert_eq!(last.content, "last page");
        assert_eq!(last.source.page_number, Some(2));
        assert_eq!(last.source.file_type, FileType::Pdf);
    }
}
