//! Splits extracted text into overlapping, context-window-sized chunks.
//!
//! Offsets and sizes are measured in characters so the invariants hold for
//! multi-byte text. Coverage is total: consecutive chunks overlap by exactly
//! the configured amount and the final chunk absorbs the remainder.

use crate::core::error::{AnalyzerError, Result};

#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    /// Start offset into the source text, in characters.
    pub start: usize,
    /// End offset (exclusive), in characters.
    pub end: usize,
}

/// How far back from a hard cut we look for a paragraph or sentence break,
/// as a fraction of the chunk size.
const LOOKBACK_DIVISOR: usize = 10;

pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if max_size == 0 {
        return Err(AnalyzerError::Config("chunk size must be positive".to_string()));
    }
    if overlap >= max_size {
        return Err(AnalyzerError::Config(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, max_size
        )));
    }

    // Parallel char/byte-offset tables so slicing stays on char boundaries.
    let mut byte_offsets: Vec<usize> = Vec::new();
    let mut chars: Vec<char> = Vec::new();
    for (byte, ch) in text.char_indices() {
        byte_offsets.push(byte);
        chars.push(ch);
    }
    byte_offsets.push(text.len());
    let total = chars.len();

    if total == 0 {
        return Ok(vec![]);
    }

    let lookback = max_size / LOOKBACK_DIVISOR;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + max_size).min(total);
        let end = if hard_end < total {
            adjust_to_break(&chars, start, hard_end, lookback, overlap).unwrap_or(hard_end)
        } else {
            hard_end
        };

        chunks.push(Chunk {
            index: chunks.len(),
            text: text[byte_offsets[start]..byte_offsets[end]].to_string(),
            start,
            end,
        });

        if end == total {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}

/// Looks back from `hard_end` for the nearest paragraph or sentence break.
/// A candidate is only accepted when the resulting stride keeps the walk
/// moving forward; otherwise the exact offset is used.
fn adjust_to_break(
    chars: &[char],
    start: usize,
    hard_end: usize,
    lookback: usize,
    overlap: usize,
) -> Option<usize> {
    let floor = hard_end.saturating_sub(lookback);
    for pos in (floor..hard_end).rev() {
        let is_break = match chars[pos] {
            '\n' => true,
            '.' => pos + 1 >= chars.len() || chars[pos + 1].is_whitespace(),
            _ => false,
        };
        if is_break {
            let end = pos + 1;
            if end > start + overlap {
                return Some(end);
            }
            return None;
        }
    }
    None
}
