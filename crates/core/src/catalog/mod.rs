//! In-memory document catalog.
//!
//! Holds the per-document metadata the retriever needs without touching
//! disk: title, tags, and body text. Maintained by the indexing engine in
//! lockstep with the lexical index; used for pre-filtering candidates,
//! rerank candidate texts, and snippet extraction.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::note::Document;

/// Catalog entry for a single document.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub title: String,
    pub tags: BTreeSet<String>,
    pub body: String,
}

/// Filter applied to candidate documents before any ranking.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Restrict to documents under this folder prefix.
    pub folder: Option<String>,
    /// Restrict to documents carrying at least one of these tags.
    pub tags: Vec<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.folder.is_none() && self.tags.is_empty()
    }
}

/// path -> entry map over the indexed document set.
#[derive(Debug, Default)]
pub struct DocumentCatalog {
    docs: HashMap<String, CatalogEntry>,
}

impl DocumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc: &Document) {
        self.docs.insert(
            doc.path.clone(),
            CatalogEntry {
                title: doc.title.clone(),
                tags: doc.tags.clone(),
                body: doc.body.clone(),
            },
        );
    }

    pub fn remove(&mut self, path: &str) {
        self.docs.remove(path);
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }

    pub fn get(&self, path: &str) -> Option<&CatalogEntry> {
        self.docs.get(path)
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

    /// Paths passing the given filters. `None` when no filter applies, so
    /// ranking stages can skip candidate checks entirely.
    pub fn filter(&self, filters: &SearchFilters) -> Option<HashSet<String>> {
        if filters.is_empty() {
            return None;
        }

        let wanted_tags: Vec<&str> =
            filters.tags.iter().map(|t| t.trim_start_matches('#')).collect();

        let matching = self
            .docs
            .iter()
            .filter(|(path, entry)| {
                if let Some(folder) = &filters.folder
                    && !path_has_folder_prefix(path, folder)
                {
                    return false;
                }
                if !wanted_tags.is_empty()
                    && !wanted_tags.iter().any(|t| entry.tags.contains(*t))
                {
                    return false;
                }
                true
            })
            .map(|(path, _)| path.clone())
            .collect();

        Some(matching)
    }
}

fn path_has_folder_prefix(path: &str, folder: &str) -> bool {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        return true;
    }
    path.strip_prefix(folder)
        .is_some_and(|rest| rest.starts_with('/'))
}
