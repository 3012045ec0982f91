//! Question-aware text chunker.
//!
//! Mark schemes are laid out question by question, so the chunker first
//! looks for line-leading question labels (`2`, `2 (a)`, `2(a)(ii)`) and
//! cuts one chunk per label. Documents without any label fall back to
//! paragraph-boundary splitting that respects a maximum chunk size.
//!
//! Chunk IDs are derived from the source document ID and the chunk's
//! position, so re-chunking the same text always yields the same IDs.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::models::{Chunk, DocType};

/// Default maximum chunk size for the paragraph fallback, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 800;

/// Default overlap between consecutive pieces of a hard-split paragraph.
pub const DEFAULT_OVERLAP_CHARS: usize = 120;

#[derive(Debug, Clone)]
pub struct Chunker {
    pub max_chunk_chars: usize,
    /// Characters repeated at the start of the next piece when a paragraph
    /// longer than `max_chunk_chars` is hard-split. Always `< max_chunk_chars`.
    pub overlap_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_CHARS).with_overlap_chars(DEFAULT_OVERLAP_CHARS)
    }
}

impl Chunker {
    /// A chunker without overlap.
    pub fn new(max_chunk_chars: usize) -> Self {
        Self {
            max_chunk_chars: max_chunk_chars.max(1),
            overlap_chars: 0,
        }
    }

    pub fn with_overlap_chars(mut self, overlap_chars: usize) -> Self {
        self.overlap_chars = overlap_chars.min(self.max_chunk_chars - 1);
        self
    }

    /// Split a document into ordered chunks.
    ///
    /// Empty or whitespace-only text yields no chunks.
    pub fn chunk(&self, text: &str, doc_type: DocType, source_document_id: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = split_on_question_labels(text)
            .unwrap_or_else(|| split_paragraphs(text, self.max_chunk_chars, self.overlap_chars));

        pieces
            .into_iter()
            .enumerate()
            .map(|(position, (question_id, body))| {
                Chunk::new(source_document_id, doc_type, position, question_id, &body)
            })
            .collect()
    }
}

/// Chunk with the default settings.
pub fn chunk(text: &str, doc_type: DocType, source_document_id: &str) -> Vec<Chunk> {
    Chunker::default().chunk(text, doc_type, source_document_id)
}

fn question_label_re() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        Regex::new(r"(?mi)^[ \t]*(\d{1,2})(?:[ \t]*(\([a-z]\)))?(?:[ \t]*(\([ivx]+\)))?(?:[ \t]|$)")
            .expect("question label pattern is valid")
    })
}

/// Returns `None` when the text has no question labels at all.
fn split_on_question_labels(text: &str) -> Option<Vec<(Option<String>, String)>> {
    let matches: Vec<Captures> = question_label_re().captures_iter(text).collect();
    if matches.is_empty() {
        return None;
    }

    let mut pieces = Vec::new();

    // Anything before the first label (headers, instructions) stays retrievable.
    let first_start = matches[0].get(0).map(|m| m.start()).unwrap_or(0);
    let preamble = text[..first_start].trim();
    if !preamble.is_empty() {
        pieces.push((None, preamble.to_string()));
    }

    for (i, caps) in matches.iter().enumerate() {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let body = text[start..end].trim();
        if body.is_empty() {
            continue;
        }
        pieces.push((Some(format_question_id(caps)), body.to_string()));
    }

    Some(pieces)
}

fn format_question_id(caps: &Captures) -> String {
    (1..=3)
        .filter_map(|i| caps.get(i))
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Paragraph-boundary splitting: paragraphs (`\n\n`) are packed into chunks
/// of at most `max_chars`; a single paragraph longer than that is hard-split
/// at the last newline or space before the limit, each piece after the first
/// starting `overlap` characters before the previous one ended.
fn split_paragraphs(text: &str, max_chars: usize, overlap: usize) -> Vec<(Option<String>, String)> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current_buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !current_buf.is_empty() {
            chunks.push(std::mem::take(&mut current_buf));
        }

        if trimmed.len() > max_chars {
            let mut start = 0;
            while start < trimmed.len() {
                let remaining = &trimmed[start..];
                let split_at = floor_char_boundary(remaining, remaining.len().min(max_chars));
                let actual_split = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind('\n')
                        .or_else(|| remaining[..split_at].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                // A single character wider than max_chars still has to move forward.
                let actual_split = if actual_split == 0 {
                    remaining
                        .char_indices()
                        .nth(1)
                        .map(|(i, _)| i)
                        .unwrap_or(remaining.len())
                } else {
                    actual_split
                };
                let piece = remaining[..actual_split].trim();
                if !piece.is_empty() {
                    chunks.push(piece.to_string());
                }

                let end = start + actual_split;
                if end >= trimmed.len() {
                    break;
                }
                let back = overlap_start(trimmed, end, overlap);
                start = if back > start { back } else { end };
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        chunks.push(current_buf);
    }

    chunks.into_iter().map(|c| (None, c)).collect()
}

/// Byte offset `overlap` characters before `end`.
fn overlap_start(text: &str, end: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return end;
    }
    text[..end]
        .char_indices()
        .rev()
        .nth(overlap - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
