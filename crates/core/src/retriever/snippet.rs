//! Result snippet extraction.

use crate::lexical::tokenize;

const SNIPPET_LEN: usize = 200;

/// A short excerpt of the body centred on the first query-term match.
///
/// Falls back to the leading text when no term occurs (vector-only hits).
/// Whitespace runs are collapsed so the snippet stays single-line.
pub fn extract(body: &str, query: &str) -> String {
    let flat = collapse_whitespace(body);
    if flat.is_empty() {
        return String::new();
    }

    let lower = flat.to_lowercase();
    let hit = tokenize(query)
        .iter()
        .filter_map(|term| lower.find(term.as_str()))
        .min();

    let (start, from_start) = match hit {
        Some(pos) => {
            let context = SNIPPET_LEN / 4;
            let start = pos.saturating_sub(context);
            (floor_char_boundary(&flat, start), start == 0)
        }
        None => (0, true),
    };

    let end = floor_char_boundary(
        &flat,
        (start + SNIPPET_LEN).min(flat.len()),
    );
    let mut out = String::new();
    if !from_start {
        out.push('…');
    }
    out.push_str(flat[start..end].trim());
    if end < flat.len() {
        out.push('…');
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
