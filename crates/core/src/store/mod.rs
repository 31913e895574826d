//! External service boundaries: vector store, embeddings, reranking.
//!
//! The core consumes these as black boxes. Contracts:
//! - vectors persist across process restarts (provider-dependent);
//! - `query` distances are cosine distances, lower = more similar;
//! - a handle opened before another handle's writes may not observe them
//!   until reacquired, which is why handles go through [`EpochHandle`].

pub mod epoch;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use epoch::EpochHandle;
pub use memory::{HashingEmbedder, InMemoryCollection, InMemoryProvider};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("embedding service error: {0}")]
    Embedding(String),

    #[error("vector store error: {0}")]
    Backend(String),

    #[error("reranking service error: {0}")]
    Rerank(String),

    #[error("no stored vector for record {0}")]
    RecordNotFound(String),
}

/// Metadata persisted alongside each vector record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    /// Vault-relative document path.
    pub path: String,
    pub title: String,
    pub tags: Vec<String>,
    /// Content hash at upsert time.
    pub content_hash: String,
}

/// One similarity-search hit, ordered by ascending distance.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub path: String,
    /// Cosine distance; lower = more similar.
    pub distance: f32,
}

/// Metadata filter evaluated inside the store, before ranking depth is
/// spent.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    /// Whole-component folder prefix on the stored path.
    pub path_prefix: Option<String>,
    /// At least one of these tags must be present.
    pub tags: Vec<String>,
}

impl VectorFilter {
    pub fn is_empty(&self) -> bool {
        self.path_prefix.is_none() && self.tags.is_empty()
    }

    /// Evaluate the filter against record metadata.
    pub fn matches(&self, meta: &VectorMetadata) -> bool {
        if let Some(prefix) = &self.path_prefix {
            let prefix = prefix.trim_end_matches('/');
            let under = meta
                .path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'));
            if !prefix.is_empty() && !under {
                return false;
            }
        }
        if !self.tags.is_empty() {
            let any = self
                .tags
                .iter()
                .map(|t| t.trim_start_matches('#'))
                .any(|t| meta.tags.iter().any(|have| have == t));
            if !any {
                return false;
            }
        }
        true
    }
}

/// Produces fixed-length float vectors for document bodies and queries.
/// The only source of vector representations: failure here is fatal for
/// the document or query it was requested for.
pub trait EmbeddingService: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError>;
}

/// Persisted vector collection.
pub trait VectorStore: Send + Sync {
    fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: &VectorMetadata,
    ) -> Result<(), StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Nearest records by cosine distance, ascending, at most `top_k`.
    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<VectorHit>, StoreError>;

    /// Stored vector for a record id, if any. Seeds similar-note queries.
    fn fetch(&self, id: &str) -> Result<Option<Vec<f32>>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}

/// Opens store handles; each open handle observes the collection as of its
/// acquisition.
pub trait VectorStoreProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn VectorStore>, StoreError>;
}

/// Shortlist entry handed to the reranker.
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    pub path: String,
    pub text: String,
}

/// Reranker output: a permutation of candidate indices with scores,
/// best first.
#[derive(Debug, Clone, Copy)]
pub struct RerankScore {
    /// Index into the candidate slice passed to `rerank`.
    pub index: usize,
    pub score: f32,
}

/// Optional relevance reranking over a fused shortlist. Absence or
/// failure degrades: the caller keeps the fused order.
pub trait RerankService: Send + Sync {
    fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
    ) -> Result<Vec<RerankScore>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(path: &str, tags: &[&str]) -> VectorMetadata {
        VectorMetadata {
            path: path.to_string(),
            title: String::new(),
            tags: tags.iter().map(ToString::to_string).collect(),
            content_hash: String::new(),
        }
    }

    #[test]
    fn filter_on_folder_prefix() {
        let filter = VectorFilter {
            path_prefix: Some("work".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&meta("work/a.md", &[])));
        assert!(!filter.matches(&meta("workshop/a.md", &[])));
        assert!(!filter.matches(&meta("home/a.md", &[])));
    }

    #[test]
    fn filter_on_tags_matches_any() {
        let filter = VectorFilter {
            tags: vec!["#project".to_string(), "draft".to_string()],
            ..Default::default()
        };
        assert!(filter.matches(&meta("a.md", &["project"])));
        assert!(filter.matches(&meta("b.md", &["draft", "other"])));
        assert!(!filter.matches(&meta("c.md", &["misc"])));
    }
}
