//! Splits ingested documents into sentence-aligned chunks with overlap

use crate::config::TextConfig;
use crate::text::TextNormalizer;

/// Packs normalized sentences into chunks of at most `chunk_size` bytes.
///
/// Consecutive chunks share trailing sentences totalling at most
/// `chunk_overlap` bytes. A sentence longer than `chunk_size` is split at the
/// last whitespace before the limit.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    min_chunk_chars: usize,
    normalizer: TextNormalizer,
}

impl TextChunker {
    /// Create a chunker; overlap is capped below the chunk size
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
            min_chunk_chars: 1,
            normalizer: TextNormalizer::new(),
        }
    }

    /// Build from the text section of the configuration
    pub fn from_config(config: &TextConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap).with_min_chunk_chars(config.min_chunk_chars)
    }

    /// Drop chunks shorter than this many characters
    pub fn with_min_chunk_chars(mut self, min_chunk_chars: usize) -> Self {
        self.min_chunk_chars = min_chunk_chars.max(1);
        self
    }

    /// Split `text` into chunk strings
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for sentence in self.normalizer.sentences(text) {
            self.split_long(&sentence.text, &mut pieces);
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0usize;

        for piece in &pieces {
            let added = if current.is_empty() { piece.len() } else { piece.len() + 1 };
            if !current.is_empty() && current_len + added > self.chunk_size {
                chunks.push(current.join(" "));

                // Carry trailing sentences into the next chunk
                let mut carried: Vec<&str> = Vec::new();
                let mut carried_len = 0usize;
                for prev in current.iter().rev() {
                    let extra = if carried.is_empty() { prev.len() } else { prev.len() + 1 };
                    if carried_len + extra > self.chunk_overlap
                        || carried_len + extra + piece.len() + 1 > self.chunk_size
                    {
                        break;
                    }
                    carried.push(prev);
                    carried_len += extra;
                }
                carried.reverse();
                current = carried;
                current_len = carried_len;
            }
            current_len += if current.is_empty() { piece.len() } else { piece.len() + 1 };
            current.push(piece);
        }
        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
            .into_iter()
            .filter(|c| c.trim().chars().count() >= self.min_chunk_chars)
            .collect()
    }

    fn split_long(&self, sentence: &str, out: &mut Vec<String>) {
        let mut rest = sentence;
        while rest.len() > self.chunk_size {
            let limit = find_char_boundary(rest, self.chunk_size);
            let cut = rest[..limit]
                .rfind(char::is_whitespace)
                .filter(|&pos| pos > 0)
                .unwrap_or(limit.max(first_char_len(rest)));
            out.push(rest[..cut].trim_end().to_string());
            rest = rest[cut..].trim_start();
        }
        if !rest.is_empty() {
            out.push(rest.to_string());
        }
    }
}

/// Find a safe character boundary at or before the given position
fn find_char_boundary(text: &str, mut pos: usize) -> usize {
    pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn first_char_len(text: &str) -> usize {
    text.chars().next().map(char::len_utf8).unwrap_or(0)
}
