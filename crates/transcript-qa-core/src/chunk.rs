//! Recursive character text splitter.
//!
//! Splits retrieval unit content into sub-chunks that fit the completion
//! model's context budget. Lengths are measured in characters.
//!
//! # Algorithm
//!
//! 1. Pick the first separator (`"\n\n"`, `"\n"`, `" "`, then per-character)
//!    that occurs in the text and split on it.
//! 2. Pieces shorter than `chunk_chars` are merged back together (joined by
//!    the separator) until the next piece would overflow, then the buffer is
//!    flushed as a chunk.
//! 3. After each flush, leading pieces are dropped until at most
//!    `overlap_chars` remain, so consecutive chunks share a tail/head.
//! 4. Pieces that are themselves too long are split again with the
//!    remaining separators.
//!
//! # Example
//!
//! ```rust
//! use transcript_qa_core::chunk::{split_text, SplitterConfig};
//!
//! let chunks = split_text("Short utterance.", &SplitterConfig::default());
//! assert_eq!(chunks, vec!["Short utterance.".to_string()]);
//! ```

/// Default maximum sub-chunk size, in characters.
pub const DEFAULT_CHUNK_CHARS: usize = 500;
/// Default overlap between consecutive sub-chunks, in characters.
pub const DEFAULT_OVERLAP_CHARS: usize = 50;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Size limits for [`split_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_chars: DEFAULT_CHUNK_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }
}

/// Split `text` into trimmed, non-empty sub-chunks of at most
/// `chunk_chars` characters.
pub fn split_text(text: &str, config: &SplitterConfig) -> Vec<String> {
    let chunk_chars = config.chunk_chars.max(1);
    let overlap_chars = config.overlap_chars.min(chunk_chars.saturating_sub(1));
    split_recursive(text, &SEPARATORS, chunk_chars, overlap_chars)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_chars: usize,
    overlap_chars: usize,
) -> Vec<String> {
    let mut separator = "";
    let mut remaining: &[&str] = &[];
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            separator = sep;
            remaining = &[];
            break;
        }
        if text.contains(sep) {
            separator = sep;
            remaining = &separators[i + 1..];
            break;
        }
    }

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<String> = Vec::new();

    for piece in pieces {
        if char_len(&piece) < chunk_chars {
            fitting.push(piece);
            continue;
        }

        if !fitting.is_empty() {
            chunks.extend(merge_pieces(&fitting, separator, chunk_chars, overlap_chars));
            fitting.clear();
        }

        if remaining.is_empty() {
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        } else {
            chunks.extend(split_recursive(&piece, remaining, chunk_chars, overlap_chars));
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, separator, chunk_chars, overlap_chars));
    }

    chunks
}

/// Greedily join small pieces into chunks, carrying an overlap window.
fn merge_pieces(
    pieces: &[String],
    separator: &str,
    chunk_chars: usize,
    overlap_chars: usize,
) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let joiner = if current.is_empty() { 0 } else { sep_len };

        if total + len + joiner > chunk_chars && !current.is_empty() {
            push_joined(&mut chunks, &current, separator);

            // Keep only the tail that fits both the overlap and the next piece.
            while !current.is_empty() {
                let fits_overlap = total <= overlap_chars;
                let fits_next = total + len + sep_len <= chunk_chars;
                if fits_overlap && fits_next {
                    break;
                }
                let joiner = if current.len() > 1 { sep_len } else { 0 };
                total = total.saturating_sub(char_len(current[0]) + joiner);
                current.remove(0);
            }
        }

        let joiner = if current.is_empty() { 0 } else { sep_len };
        current.push(piece);
        total += len + joiner;
    }

    push_joined(&mut chunks, &current, separator);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, pieces: &[&str], separator: &str) {
    let joined = pieces.join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
