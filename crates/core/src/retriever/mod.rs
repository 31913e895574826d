//! Hybrid retrieval: lexical and vector ranking fused, optionally
//! reranked.
//!
//! A search runs both rankers over the same pre-filtered candidate set,
//! fuses their rank lists, and returns the top `k`. The reranker is a
//! quality refinement, never a dependency: if it is absent or fails, the
//! fused order stands.

pub mod fusion;
pub mod snippet;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use thiserror::Error;

use crate::catalog::{DocumentCatalog, SearchFilters};
use crate::lexical::LexicalIndex;
use crate::store::{
    EmbeddingService, EpochHandle, RerankCandidate, RerankService, StoreError,
    VectorFilter, VectorHit,
};
use crate::vault::record_id;

pub use fusion::{FusionConfig, ScoreProvenance};

#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("query must not be empty")]
    InvalidQuery,

    #[error("document not indexed: {0}")]
    UnknownDocument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Retrieval depths and fusion parameters.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Candidates taken from the lexical ranker.
    pub lexical_depth: usize,
    /// Candidates taken from the vector ranker.
    pub vector_depth: usize,
    /// Minimum shortlist size handed to the reranker.
    pub rerank_shortlist: usize,
    pub fusion: FusionConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            lexical_depth: 50,
            vector_depth: 50,
            rerank_shortlist: 20,
            fusion: FusionConfig::default(),
        }
    }
}

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    pub score: f32,
    pub snippet: String,
    pub provenance: ScoreProvenance,
}

/// Read side over the shared in-memory structures and the vector store.
pub struct Retriever {
    lexical: Arc<RwLock<LexicalIndex>>,
    catalog: Arc<RwLock<DocumentCatalog>>,
    vectors: Arc<EpochHandle>,
    embedder: Arc<dyn EmbeddingService>,
    reranker: Option<Arc<dyn RerankService>>,
    config: SearchConfig,
}

impl Retriever {
    pub fn new(
        lexical: Arc<RwLock<LexicalIndex>>,
        catalog: Arc<RwLock<DocumentCatalog>>,
        vectors: Arc<EpochHandle>,
        embedder: Arc<dyn EmbeddingService>,
        reranker: Option<Arc<dyn RerankService>>,
        config: SearchConfig,
    ) -> Self {
        Self { lexical, catalog, vectors, embedder, reranker, config }
    }

    /// Hybrid search over the indexed vault.
    pub fn search(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, RetrieverError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrieverError::InvalidQuery);
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.catalog.read().filter(filters);
        if candidates.as_ref().is_some_and(HashSet::is_empty) {
            return Ok(Vec::new());
        }
        let vector_filter = to_vector_filter(filters);

        // Both rankers scan independent structures; run them side by side
        // and join before fusing.
        let (lexical_ranked, vector_ranked) = thread::scope(|s| {
            let lexical = s.spawn(|| {
                self.lexical.read().search(
                    query,
                    self.config.lexical_depth,
                    candidates.as_ref(),
                )
            });
            let vector = s.spawn(|| {
                self.query_vectors(
                    query,
                    self.config.vector_depth,
                    vector_filter.as_ref(),
                )
            });
            (lexical.join(), vector.join())
        });
        let lexical_ranked = match lexical_ranked {
            Ok(ranked) => ranked,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        let vector_ranked = match vector_ranked {
            Ok(ranked) => ranked,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        let lexical_paths: Vec<String> =
            lexical_ranked.into_iter().map(|(path, _)| path).collect();
        // Embedding is the only source of query vectors: its failure fails
        // the search. Only the reranking stage degrades.
        let vector_paths: Vec<String> =
            vector_ranked?.into_iter().map(|h| h.path).collect();

        let mut fused =
            fusion::fuse(&lexical_paths, &vector_paths, self.config.fusion);
        fused.truncate(k.max(self.config.rerank_shortlist));

        if let Some(reranker) = &self.reranker {
            fused = self.apply_rerank(reranker.as_ref(), query, fused);
        }
        fused.truncate(k);

        let catalog = self.catalog.read();
        Ok(fused
            .into_iter()
            .map(|c| {
                let entry = catalog.get(&c.path);
                SearchHit {
                    title: entry.map(|e| e.title.clone()).unwrap_or_default(),
                    snippet: entry
                        .map(|e| snippet::extract(&e.body, query))
                        .unwrap_or_default(),
                    path: c.path,
                    score: c.score,
                    provenance: c.provenance,
                }
            })
            .collect())
    }

    /// Documents nearest to an already-indexed one, excluding itself.
    pub fn similar(
        &self,
        path: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, RetrieverError> {
        let id = record_id(path);
        let seed = self
            .vectors
            .with(|s| s.fetch(&id))?
            .ok_or_else(|| RetrieverError::UnknownDocument(path.to_string()))?;

        // One extra so the seed document itself can be dropped.
        let hits = self.vectors.with(|s| s.query(&seed, k + 1, None))?;

        let catalog = self.catalog.read();
        Ok(hits
            .into_iter()
            .filter(|h| h.path != path)
            .take(k)
            .map(|h| SearchHit {
                title: catalog
                    .get(&h.path)
                    .map(|e| e.title.clone())
                    .unwrap_or_default(),
                snippet: String::new(),
                path: h.path,
                score: 1.0 - h.distance,
                provenance: ScoreProvenance::default(),
            })
            .collect())
    }

    fn query_vectors(
        &self,
        query: &str,
        depth: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<VectorHit>, StoreError> {
        let vector = self.embedder.embed(query)?;
        self.vectors.with(|s| s.query(&vector, depth, filter))
    }

    fn apply_rerank(
        &self,
        reranker: &dyn RerankService,
        query: &str,
        fused: Vec<fusion::FusedCandidate>,
    ) -> Vec<fusion::FusedCandidate> {
        let candidates: Vec<RerankCandidate> = {
            let catalog = self.catalog.read();
            fused
                .iter()
                .map(|c| RerankCandidate {
                    path: c.path.clone(),
                    text: catalog
                        .get(&c.path)
                        .map(|e| e.body.clone())
                        .unwrap_or_default(),
                })
                .collect()
        };

        match reranker.rerank(query, &candidates) {
            Ok(scores) => {
                let mut reordered = Vec::with_capacity(fused.len());
                let mut taken = vec![false; fused.len()];
                for s in &scores {
                    if let Some(c) = fused.get(s.index)
                        && !taken[s.index]
                    {
                        taken[s.index] = true;
                        let mut c = c.clone();
                        c.score = s.score;
                        c.provenance.reranked = true;
                        reordered.push(c);
                    }
                }
                // Anything the reranker left out keeps its fused position
                // at the tail.
                for (i, c) in fused.into_iter().enumerate() {
                    if !taken[i] {
                        reordered.push(c);
                    }
                }
                reordered
            }
            Err(e) => {
                tracing::warn!(error = %e, "reranker failed, keeping fused order");
                fused
            }
        }
    }
}

fn to_vector_filter(filters: &SearchFilters) -> Option<VectorFilter> {
    if filters.is_empty() {
        return None;
    }
    Some(VectorFilter {
        path_prefix: filters.folder.clone(),
        tags: filters.tags.clone(),
    })
}
