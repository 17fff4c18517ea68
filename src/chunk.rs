//! Overlapping fixed-size text chunker.
//!
//! Splits a [`Document`]'s text into windows of `max_chunk_chars`
//! characters, advancing the window start by `max_chunk_chars -
//! overlap_chars` each step, so consecutive chunks share a configurable
//! overlap. Splitting is a pure function of the text and configuration:
//! no hidden state, fully deterministic, so re-ingestion of unchanged
//! inputs produces identical chunks.
//!
//! Window arithmetic is in characters (Unicode scalar values), with
//! slicing on char boundaries so multibyte text never panics.

use crate::config::ChunkingConfig;
use crate::models::{Chunk, Document};

/// Split a document into overlapping chunks.
///
/// Empty text produces zero chunks. Text no longer than
/// `max_chunk_chars` produces exactly one chunk equal to the full text;
/// the final chunk of a longer document may be shorter than the window.
///
/// The config invariant `0 <= overlap_chars < max_chunk_chars` is
/// enforced at config load, not here.
pub fn split_document(document: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let text = &document.text;
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let window = config.max_chunk_chars;
    let step = config.max_chunk_chars - config.overlap_chars;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut position = 0usize;

    loop {
        let end = (start + window).min(char_count);
        let piece = &text[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(document, position, piece));
        position += 1;

        if end >= char_count {
            break;
        }
        start += step;
    }

    chunks
}

fn make_chunk(document: &Document, position: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("{}:{}", document.id, position),
        document_id: document.id.clone(),
        position,
        text: text.to_string(),
        title: document.title.clone(),
        source: document.source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document {
            id: "doc1".to_string(),
            title: "Doc One".to_string(),
            text: text.to_string(),
            source: "doc1.json".to_string(),
        }
    }

    fn config(max: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chunk_chars: max,
            overlap_chars: overlap,
        }
    }

    #[test]
    fn test_short_text_single_chunk() {
        let d = doc("Hello, world!");
        let chunks = split_document(&d, &config(1000, 200));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[0].id, "doc1:0");
    }

    #[test]
    fn test_exact_window_single_chunk() {
        let d = doc(&"x".repeat(100));
        let chunks = split_document(&d, &config(100, 20));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.len(), 100);
    }

    #[test]
    fn test_empty_text_zero_chunks() {
        let d = doc("");
        let chunks = split_document(&d, &config(100, 20));
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_text_shorter_than_overlap_still_one_chunk() {
        let d = doc("ab");
        let chunks = split_document(&d, &config(100, 50));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "ab");
    }

    #[test]
    fn test_chunk_lengths_bounded() {
        let d = doc(&"abcdefghij".repeat(37));
        let chunks = split_document(&d, &config(50, 10));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 50);
        }
    }

    #[test]
    fn test_overlap_reconstructs_text() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let d = doc(&text);
        let overlap = 15;
        let chunks = split_document(&d, &config(64, overlap));
        assert!(chunks.len() > 1);

        let mut rebuilt = chunks[0].text.clone();
        for c in &chunks[1..] {
            let skipped: String = c.text.chars().skip(overlap).collect();
            rebuilt.push_str(&skipped);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_overlap_reconstructs_multibyte_text() {
        let text = "héllo wörld ünïcode — ┌─┐ émojis: 🦀🚀 ".repeat(12);
        let d = doc(&text);
        let overlap = 7;
        let chunks = split_document(&d, &config(30, overlap));
        assert!(chunks.len() > 1);

        let mut rebuilt = chunks[0].text.clone();
        for c in &chunks[1..] {
            let skipped: String = c.text.chars().skip(overlap).collect();
            rebuilt.push_str(&skipped);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_positions_contiguous() {
        let d = doc(&"word ".repeat(200));
        let chunks = split_document(&d, &config(40, 8));
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.position, i);
            assert_eq!(c.id, format!("doc1:{}", i));
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma delta epsilon zeta eta theta. ".repeat(10);
        let d = doc(&text);
        let a = split_document(&d, &config(60, 12));
        let b = split_document(&d, &config(60, 12));
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.text, y.text);
        }
    }

    #[test]
    fn test_zero_overlap() {
        let d = doc(&"0123456789".repeat(5));
        let chunks = split_document(&d, &config(10, 0));
        assert_eq!(chunks.len(), 5);
        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rebuilt, d.text);
    }

    #[test]
    fn test_denormalized_attribution() {
        let d = doc("some text");
        let chunks = split_document(&d, &config(100, 0));
        assert_eq!(chunks[0].title, "Doc One");
        assert_eq!(chunks[0].source, "doc1.json");
        assert_eq!(chunks[0].document_id, "doc1");
    }
}
