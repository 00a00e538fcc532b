//! Overlapping character windows over statement text.
//!
//! Windows are measured in characters, not bytes, so a multi-byte currency
//! symbol never gets split. Consecutive windows share `overlap` characters;
//! a transaction shorter than the overlap that straddles a boundary is
//! therefore whole in at least one window.

use std::iter;

/// Split `text` into windows of at most `cap` characters.
///
/// Text within the cap comes back as a single window. `overlap` must be
/// smaller than `cap` (enforced by the config builder); a degenerate value
/// is treated as zero overlap.
pub fn chunk_text(text: &str, cap: usize, overlap: usize) -> Vec<&str> {
    let cap = cap.max(1);
    let overlap = if overlap >= cap { 0 } else { overlap };

    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    if len <= cap {
        return vec![text];
    }

    let step = cap - overlap;
    let mut chunks = Vec::with_capacity(expected_chunks(len, cap, overlap));
    let mut start = 0;
    loop {
        let end = (start + cap).min(len);
        chunks.push(&text[bounds[start]..bounds[end]]);
        if end == len {
            break;
        }
        start += step;
    }
    chunks
}

/// Number of windows [`chunk_text`] produces for `len` characters.
pub fn expected_chunks(len: usize, cap: usize, overlap: usize) -> usize {
    if len <= cap {
        1
    } else {
        (len - overlap).div_ceil(cap - overlap)
    }
}
