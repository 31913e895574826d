//! In-memory lexical index with BM25 ranking.
//!
//! Term-frequency statistics over document bodies. Removal decrements the
//! document frequencies it contributed, so incremental mutation leaves no
//! tombstones; full indexing passes still [`clear`](LexicalIndex::clear)
//! and rebuild.

use std::collections::{HashMap, HashSet};

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Tokenize text for lexical ranking: lowercase alphanumeric runs, short
/// tokens dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens.retain(|t| t.len() > 2);
    tokens
}

#[derive(Debug, Default)]
struct DocPostings {
    term_freq: HashMap<String, u32>,
    len: u32,
}

/// BM25 index over document bodies, keyed by vault-relative path.
#[derive(Debug, Default)]
pub struct LexicalIndex {
    docs: HashMap<String, DocPostings>,
    doc_freq: HashMap<String, u32>,
    total_len: u64,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document body, replacing any previous postings for the path.
    pub fn add_or_replace(&mut self, path: &str, body: &str) {
        self.remove(path);

        let tokens = tokenize(body);
        let mut postings = DocPostings { len: tokens.len() as u32, ..Default::default() };
        for token in tokens {
            *postings.term_freq.entry(token).or_insert(0) += 1;
        }

        for term in postings.term_freq.keys() {
            *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
        self.total_len += u64::from(postings.len);
        self.docs.insert(path.to_string(), postings);
    }

    /// Remove a document, decrementing the document frequencies it
    /// contributed.
    pub fn remove(&mut self, path: &str) {
        let Some(postings) = self.docs.remove(path) else {
            return;
        };
        for term in postings.term_freq.keys() {
            if let Some(df) = self.doc_freq.get_mut(term) {
                *df -= 1;
                if *df == 0 {
                    self.doc_freq.remove(term);
                }
            }
        }
        self.total_len -= u64::from(postings.len);
    }

    pub fn clear(&mut self) {
        self.docs.clear();
        self.doc_freq.clear();
        self.total_len = 0;
    }

    pub fn contains(&self, path: &str) -> bool {
        self.docs.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Rank documents against a query.
    ///
    /// Returns up to `depth` `(path, score)` pairs with positive BM25
    /// scores, sorted by score descending; ties break by path ascending so
    /// identical inputs always rank identically. When `candidates` is
    /// given, only those paths are scored (the caller's pre-filter).
    pub fn search(
        &self,
        query: &str,
        depth: usize,
        candidates: Option<&HashSet<String>>,
    ) -> Vec<(String, f32)> {
        let terms = tokenize(query);
        if terms.is_empty() || self.docs.is_empty() {
            return Vec::new();
        }

        let n = self.docs.len() as f32;
        let avg_len = self.total_len as f32 / n;

        let idfs: Vec<(&String, f32)> = terms
            .iter()
            .filter_map(|term| {
                let df = *self.doc_freq.get(term)? as f32;
                let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                Some((term, idf))
            })
            .collect();

        if idfs.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(String, f32)> = self
            .docs
            .iter()
            .filter(|(path, _)| {
                candidates.is_none_or(|set| set.contains(path.as_str()))
            })
            .filter_map(|(path, postings)| {
                let mut score = 0.0;
                for (term, idf) in &idfs {
                    let tf = *postings.term_freq.get(*term).unwrap_or(&0) as f32;
                    if tf > 0.0 {
                        let norm = K1 * (1.0 - B + B * postings.len as f32 / avg_len);
                        score += idf * tf * (K1 + 1.0) / (tf + norm);
                    }
                }
                (score > 0.0).then(|| (path.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(depth);
        scored
    }
}
