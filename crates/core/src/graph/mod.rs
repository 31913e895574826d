//! Bidirectional wikilink graph.
//!
//! Maintains a forward map (document -> outbound reference edges) and a
//! backward map (resolved target -> referencing documents). The backward
//! map is recomputed from the forward map on every structural mutation, so
//! it is the transpose of the forward map restricted to resolved, non-embed
//! edges by construction, and dangling edges gain backlinks the moment a
//! matching document appears. Recomputation is O(edges), which only runs on
//! structural changes, never on queries.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::note::{ReferenceEdge, normalize_target, stem_of};

/// Aggregate graph statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_documents: usize,
    pub total_edges: usize,
    pub orphan_documents: usize,
    pub broken_links: usize,
}

/// Bidirectional reference index over vault documents.
#[derive(Debug, Default)]
pub struct WikilinkGraph {
    /// path -> outbound edges (including dangling and embeds).
    forward: BTreeMap<String, Vec<ReferenceEdge>>,
    /// resolved target path -> source paths. Only resolved, non-embed
    /// edges appear here.
    backward: BTreeMap<String, BTreeSet<String>>,
    /// lowercase title / stem / extension-less path -> candidate paths.
    titles: HashMap<String, BTreeSet<String>>,
    /// path -> registered title (for unregistration on replace).
    doc_titles: BTreeMap<String, String>,
}

impl WikilinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document or replace its previous edges and title.
    pub fn add_or_replace(&mut self, path: &str, title: &str, edges: Vec<ReferenceEdge>) {
        self.unregister(path);
        self.register(path, title);
        self.forward.insert(path.to_string(), edges);
        self.recompute_backward();
    }

    /// Remove a document and all its edges.
    pub fn remove(&mut self, path: &str) {
        self.unregister(path);
        self.forward.remove(path);
        self.recompute_backward();
    }

    /// Drop everything (full rebuild).
    pub fn clear(&mut self) {
        self.forward.clear();
        self.backward.clear();
        self.titles.clear();
        self.doc_titles.clear();
    }

    /// Whether a document at this exact path is known.
    pub fn contains(&self, path: &str) -> bool {
        self.doc_titles.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.doc_titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_titles.is_empty()
    }

    /// Resolve a reference target (title, stem, or path, case-insensitive)
    /// to a document path.
    ///
    /// An exact path match wins; otherwise the title index applies. Two
    /// documents sharing a title is ambiguous by design: the
    /// lexicographically first path is chosen, deterministically.
    pub fn resolve(&self, target: &str) -> Option<String> {
        let normalized = normalize_target(target);

        let with_md = format!("{normalized}.md");
        if self.contains(&with_md) {
            return Some(with_md);
        }
        if self.contains(&normalized) {
            return Some(normalized);
        }

        self.titles
            .get(&normalized.to_lowercase())
            .and_then(|paths| paths.first())
            .cloned()
    }

    /// Documents whose (non-embed, resolved) edges point at this document.
    /// `name` may be a path or a title. Sorted.
    pub fn backlinks(&self, name: &str) -> Vec<String> {
        let Some(path) = self.resolve(name) else {
            return Vec::new();
        };
        self.backward
            .get(&path)
            .map(|sources| sources.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolved targets of this document's non-embed edges. Sorted, deduped.
    pub fn outgoing(&self, path: &str) -> Vec<String> {
        let Some(edges) = self.forward.get(path) else {
            return Vec::new();
        };
        let mut out: BTreeSet<String> = BTreeSet::new();
        for edge in edges.iter().filter(|e| !e.embed) {
            if let Some(target) = self.resolve(&edge.target) {
                out.insert(target);
            }
        }
        out.into_iter().collect()
    }

    /// Raw outbound edges as parsed, including dangling and embeds.
    pub fn edges(&self, path: &str) -> &[ReferenceEdge] {
        self.forward.get(path).map_or(&[], Vec::as_slice)
    }

    /// Whether any document carries an edge naming this (possibly still
    /// unresolved) target.
    pub fn is_referenced(&self, name: &str) -> bool {
        let normalized = normalize_target(name).to_lowercase();
        self.forward.values().flatten().any(|e| {
            normalize_target(&e.target).to_lowercase() == normalized
        })
    }

    /// Documents with no inbound links.
    pub fn orphans(&self) -> Vec<String> {
        self.doc_titles
            .keys()
            .filter(|p| self.backward.get(*p).is_none_or(BTreeSet::is_empty))
            .cloned()
            .collect()
    }

    /// (source, target) pairs for non-embed edges that resolve to nothing.
    pub fn broken_links(&self) -> Vec<(String, String)> {
        let mut broken = Vec::new();
        for (source, edges) in &self.forward {
            for edge in edges.iter().filter(|e| !e.embed) {
                if self.resolve(&edge.target).is_none() {
                    broken.push((source.clone(), edge.target.clone()));
                }
            }
        }
        broken
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_documents: self.doc_titles.len(),
            total_edges: self.forward.values().map(Vec::len).sum(),
            orphan_documents: self.orphans().len(),
            broken_links: self.broken_links().len(),
        }
    }

    fn register(&mut self, path: &str, title: &str) {
        self.doc_titles.insert(path.to_string(), title.to_string());
        for key in Self::title_keys(path, title) {
            self.titles.entry(key).or_default().insert(path.to_string());
        }
    }

    fn unregister(&mut self, path: &str) {
        let Some(old_title) = self.doc_titles.remove(path) else {
            return;
        };
        for key in Self::title_keys(path, &old_title) {
            if let Some(paths) = self.titles.get_mut(&key) {
                paths.remove(path);
                if paths.is_empty() {
                    self.titles.remove(&key);
                }
            }
        }
    }

    fn title_keys(path: &str, title: &str) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        keys.insert(title.to_lowercase());
        keys.insert(stem_of(path).to_lowercase());
        keys.insert(
            path.strip_suffix(".md").unwrap_or(path).to_lowercase(),
        );
        keys
    }

    /// Rebuild the backward map as the transpose of the forward map
    /// restricted to resolved, non-embed edges.
    fn recompute_backward(&mut self) {
        let mut backward: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (source, edges) in &self.forward {
            for edge in edges.iter().filter(|e| !e.embed) {
                if let Some(target) = self.resolve(&edge.target) {
                    backward.entry(target).or_default().insert(source.clone());
                }
            }
        }
        self.backward = backward;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(target: &str) -> ReferenceEdge {
        ReferenceEdge {
            target: target.to_string(),
            alias: None,
            section: None,
            embed: false,
        }
    }

    fn embed(target: &str) -> ReferenceEdge {
        ReferenceEdge { embed: true, ..edge(target) }
    }

    #[test]
    fn backlinks_follow_title_resolution() {
        let mut g = WikilinkGraph::new();
        g.add_or_replace("a.md", "A", vec![edge("B")]);
        g.add_or_replace("notes/b.md", "B", vec![]);

        assert_eq!(g.backlinks("B"), vec!["a.md".to_string()]);
        assert_eq!(g.backlinks("notes/b.md"), vec!["a.md".to_string()]);
        assert_eq!(g.outgoing("a.md"), vec!["notes/b.md".to_string()]);
    }

    #[test]
    fn removal_updates_backlinks() {
        let mut g = WikilinkGraph::new();
        g.add_or_replace("a.md", "A", vec![edge("b")]);
        g.add_or_replace("b.md", "B", vec![]);
        assert_eq!(g.backlinks("b.md"), vec!["a.md".to_string()]);

        g.remove("a.md");
        assert!(g.backlinks("b.md").is_empty());
    }

    #[test]
    fn dangling_edges_resolve_when_target_appears() {
        let mut g = WikilinkGraph::new();
        g.add_or_replace("a.md", "A", vec![edge("B")]);
        assert!(g.backlinks("B").is_empty());
        assert_eq!(g.broken_links().len(), 1);

        // Creating B resolves the dangling edge without touching A.
        g.add_or_replace("b.md", "B", vec![]);
        assert_eq!(g.backlinks("B"), vec!["a.md".to_string()]);
        assert!(g.broken_links().is_empty());
    }

    #[test]
    fn ambiguous_titles_pick_lexicographically_first_path() {
        let mut g = WikilinkGraph::new();
        g.add_or_replace("z/topic.md", "Topic", vec![]);
        g.add_or_replace("a/topic.md", "Topic", vec![]);
        g.add_or_replace("src.md", "Src", vec![edge("Topic")]);

        assert_eq!(g.resolve("Topic"), Some("a/topic.md".to_string()));
        assert_eq!(g.backlinks("a/topic.md"), vec!["src.md".to_string()]);
        assert!(g.backlinks("z/topic.md").is_empty());
    }

    #[test]
    fn embeds_do_not_create_backlinks() {
        let mut g = WikilinkGraph::new();
        g.add_or_replace("a.md", "A", vec![embed("b")]);
        g.add_or_replace("b.md", "B", vec![]);

        assert!(g.backlinks("b.md").is_empty());
        assert!(g.outgoing("a.md").is_empty());
    }

    #[test]
    fn replace_drops_old_edges() {
        let mut g = WikilinkGraph::new();
        g.add_or_replace("a.md", "A", vec![edge("b")]);
        g.add_or_replace("b.md", "B", vec![]);
        g.add_or_replace("c.md", "C", vec![]);

        g.add_or_replace("a.md", "A", vec![edge("c")]);
        assert!(g.backlinks("b.md").is_empty());
        assert_eq!(g.backlinks("c.md"), vec!["a.md".to_string()]);
    }

    #[test]
    fn resolution_is_case_insensitive() {
        let mut g = WikilinkGraph::new();
        g.add_or_replace("Notes/Alpha.md", "Alpha", vec![]);
        assert_eq!(g.resolve("alpha"), Some("Notes/Alpha.md".to_string()));
        assert_eq!(g.resolve("notes/alpha"), Some("Notes/Alpha.md".to_string()));
    }

    #[test]
    fn stats_and_orphans() {
        let mut g = WikilinkGraph::new();
        g.add_or_replace("a.md", "A", vec![edge("b")]);
        g.add_or_replace("b.md", "B", vec![]);

        let stats = g.stats();
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.total_edges, 1);
        assert_eq!(stats.orphan_documents, 1);
        assert_eq!(g.orphans(), vec!["a.md".to_string()]);
    }
}
