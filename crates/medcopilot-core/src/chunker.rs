//! Fixed-size sliding-window chunking.
//!
//! Offsets are counted in chars, so a window never splits a code point.
//! Consecutive windows share exactly `overlap` chars; the walk stops as soon
//! as a window reaches the end of the text.
use std::ops::Range;

use crate::error::{Error, Result};

fn check_params(size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::Chunking("size must be > 0".into()));
    }
    if overlap >= size {
        return Err(Error::Chunking(format!("overlap ({overlap}) must be smaller than size ({size})")));
    }
    Ok(())
}

/// Char ranges of the windows covering a text of `len` chars.
pub fn chunk_spans(len: usize, size: usize, overlap: usize) -> Result<Vec<Range<usize>>> {
    check_params(size, overlap)?;
    let step = size - overlap;
    let mut spans = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + size).min(len);
        spans.push(start..end);
        if end >= len { break; }
        start += step;
    }
    Ok(spans)
}

/// Split `text` into overlapping windows of at most `size` chars.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let spans = chunk_spans(bounds.len() - 1, size, overlap)?;
    Ok(spans
        .into_iter()
        .map(|r| text[bounds[r.start]..bounds[r.end]].to_string())
        .collect())
}

/// Headers, footers and figure captions rarely survive this cut.
pub fn is_noise(chunk: &str, min_chars: usize) -> bool { chunk.trim().chars().count() < min_chars }

/// UTF-8 safe truncation to at most `max` chars.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
