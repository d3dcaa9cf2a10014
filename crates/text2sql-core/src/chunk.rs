//! Boundary-aware overlapping text chunker.
//!
//! Splits a table description into [`Fragment`]s of at most `chunk_size`
//! characters, each starting exactly `chunk_overlap` characters before the
//! previous one ended. Cuts prefer the largest semantic boundary available
//! inside the window before falling back to a hard cut.
//!
//! Lengths and offsets are counted in characters (Unicode scalar values),
//! never bytes, so a cut can't land inside a multi-byte character.
//!
//! # Algorithm
//!
//! 1. Empty text produces no fragments.
//! 2. Text that fits in `chunk_size` is returned whole.
//! 3. Otherwise, from `start`, look for a cut in `(start + overlap, start + chunk_size]`,
//!    trying in order: paragraph break (`\n\n`), line break, sentence end
//!    (`". "`, `"? "`, `"! "`), space. The cut goes after the separator.
//! 4. With no boundary in the window, cut hard at `start + chunk_size`.
//! 5. Emit `text[start..cut]`, continue from `cut - overlap`.
//!
//! Because every fragment after the first starts `overlap` characters before
//! its predecessor ends, dropping the first `overlap` characters of each
//! later fragment and concatenating reconstructs the input exactly.
//!
//! # Example
//!
//! ```rust
//! use text2sql_core::chunk::chunk_text;
//!
//! let pieces = chunk_text("orders placed by customers", 100, 10);
//! assert_eq!(pieces, vec![(0, "orders placed by customers".to_string())]);
//! ```

use crate::models::{Fragment, SchemaDocument};

/// Default maximum fragment length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 100;
/// Default overlap between consecutive fragments, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 10;

/// Boundary classes, largest first. Separators within a class are equal.
const BOUNDARIES: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "? ", "! "], &[" "]];

/// Split every document into fragments, preserving document order.
pub fn chunk_documents(
    docs: &[SchemaDocument],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Fragment> {
    docs.iter()
        .flat_map(|doc| chunk_document(doc, chunk_size, chunk_overlap))
        .collect()
}

/// Split one document into fragments that inherit its metadata.
pub fn chunk_document(doc: &SchemaDocument, chunk_size: usize, chunk_overlap: usize) -> Vec<Fragment> {
    chunk_text(&doc.text, chunk_size, chunk_overlap)
        .into_iter()
        .map(|(start_index, text)| Fragment {
            text,
            start_index,
            document_index: doc.index,
            metadata: doc.metadata.clone(),
        })
        .collect()
}

/// Split `text` into `(start_index, fragment)` pairs.
///
/// `chunk_size` is raised to at least 1 and `chunk_overlap` is clamped below
/// `chunk_size` so the walk always makes progress.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, String)> {
    let chunk_size = chunk_size.max(1);
    let overlap = chunk_overlap.min(chunk_size - 1);

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < len {
        if len - start <= chunk_size {
            pieces.push((start, chars[start..].iter().collect()));
            break;
        }

        let window_end = start + chunk_size;
        let cut = find_cut(&chars, start, window_end, start + overlap + 1);
        pieces.push((start, chars[start..cut].iter().collect()));
        start = cut - overlap;
    }

    pieces
}

/// Pick the cut position for the window `[start, window_end)`.
///
/// The result lies in `[min_cut, window_end]`.
fn find_cut(chars: &[char], start: usize, window_end: usize, min_cut: usize) -> usize {
    for class in BOUNDARIES {
        let best = class
            .iter()
            .filter_map(|sep| last_cut_after(chars, start, window_end, min_cut, sep))
            .max();
        if let Some(cut) = best {
            return cut;
        }
    }
    window_end
}

/// Position just after the last occurrence of `sep` that ends inside
/// `[min_cut, window_end]`.
fn last_cut_after(
    chars: &[char],
    start: usize,
    window_end: usize,
    min_cut: usize,
    sep: &str,
) -> Option<usize> {
    let sep: Vec<char> = sep.chars().collect();
    let width = sep.len();
    if window_end < start + width {
        return None;
    }

    let mut pos = window_end - width;
    loop {
        let cut = pos + width;
        if cut < min_cut {
            return None;
        }
        if chars[pos..cut] == sep[..] {
            return Some(cut);
        }
        if pos == start {
            return None;
        }
        pos -= 1;
    }
}
