//! Vault service facade.
//!
//! Owns the shared in-memory structures and wires the indexing engine and
//! retriever over them. One instance per vault; callers (CLI, MCP server,
//! tests) go through this and nothing else.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::catalog::{DocumentCatalog, SearchFilters};
use crate::engine::{EngineError, IndexReport, IndexingEngine};
use crate::graph::{GraphStats, WikilinkGraph};
use crate::lexical::LexicalIndex;
use crate::manifest::{ManifestDb, ManifestError};
use crate::note::{Document, normalize_path, parse_document};
use crate::retriever::{
    Retriever, RetrieverError, SearchConfig, SearchHit,
};
use crate::store::{
    EmbeddingService, EpochHandle, RerankService, StoreError,
    VectorStoreProvider,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("query must not be empty")]
    InvalidQuery,

    #[error(transparent)]
    Index(#[from] EngineError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RetrieverError> for ServiceError {
    fn from(e: RetrieverError) -> Self {
        match e {
            RetrieverError::InvalidQuery => Self::InvalidQuery,
            RetrieverError::UnknownDocument(path) => Self::NotFound(path),
            RetrieverError::Store(e) => Self::Store(e),
        }
    }
}

/// Facade over one vault's index and retrieval state.
pub struct VaultService {
    root: PathBuf,
    engine: IndexingEngine,
    retriever: Retriever,
    graph: Arc<RwLock<WikilinkGraph>>,
    vectors: Arc<EpochHandle>,
    // Serializes indexing passes; searches are never blocked by it.
    index_lock: Mutex<()>,
}

impl VaultService {
    pub fn new(
        root: PathBuf,
        excluded_folders: Vec<PathBuf>,
        manifest: ManifestDb,
        provider: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingService>,
        reranker: Option<Arc<dyn RerankService>>,
        search: SearchConfig,
    ) -> Result<Self, ServiceError> {
        let lexical = Arc::new(RwLock::new(LexicalIndex::new()));
        let catalog = Arc::new(RwLock::new(DocumentCatalog::new()));
        let graph = Arc::new(RwLock::new(WikilinkGraph::new()));
        let vectors = Arc::new(EpochHandle::open(provider)?);

        let engine = IndexingEngine::new(
            root.clone(),
            excluded_folders,
            manifest,
            lexical.clone(),
            catalog.clone(),
            graph.clone(),
            vectors.clone(),
            embedder.clone(),
        );
        let retriever = Retriever::new(
            lexical,
            catalog,
            vectors.clone(),
            embedder,
            reranker,
            search,
        );

        Ok(Self {
            root,
            engine,
            retriever,
            graph,
            vectors,
            index_lock: Mutex::new(()),
        })
    }

    /// Run one indexing pass and reacquire the vector store handle, so
    /// subsequent searches observe everything the pass wrote.
    pub fn index(&self, full: bool) -> Result<IndexReport, ServiceError> {
        let _guard = self.index_lock.lock();
        let report = self.engine.reindex(full)?;
        self.vectors.reload()?;
        Ok(report)
    }

    /// Hybrid search over the indexed vault.
    pub fn search(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        Ok(self.retriever.search(query, k, filters)?)
    }

    /// Documents linking to the named document.
    ///
    /// `name` may be a path, a title, or a stem. A target that exists only
    /// as a dangling reference has no backlinks yet, which is an empty
    /// answer, not an error; a name nothing in the vault knows about is.
    pub fn backlinks(&self, name: &str) -> Result<Vec<String>, ServiceError> {
        let graph = self.graph.read();
        if graph.resolve(name).is_some() {
            return Ok(graph.backlinks(name));
        }
        if graph.is_referenced(name) {
            return Ok(Vec::new());
        }
        Err(ServiceError::NotFound(name.to_string()))
    }

    /// Resolved outbound link targets of a document.
    pub fn outgoing(&self, path: &str) -> Result<Vec<String>, ServiceError> {
        let path = normalize_path(path);
        let graph = self.graph.read();
        if !graph.contains(&path) {
            return Err(ServiceError::NotFound(path));
        }
        Ok(graph.outgoing(&path))
    }

    /// Documents most similar to an already-indexed one.
    pub fn similar(
        &self,
        path: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        let path = normalize_path(path);
        Ok(self.retriever.similar(&path, k)?)
    }

    /// Read and parse one document straight from disk.
    pub fn read(&self, path: &str) -> Result<Document, ServiceError> {
        let path = normalize_path(path);
        let absolute = self.root.join(&path);
        let raw = match std::fs::read_to_string(&absolute) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::NotFound(path));
            }
            Err(e) => return Err(ServiceError::Read { path, source: e }),
        };
        let modified = absolute
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::UNIX_EPOCH);
        Ok(parse_document(&path, &raw, modified.into()))
    }

    /// Reacquire the vector store handle without indexing. Picks up writes
    /// committed by other processes. Returns the new handle epoch.
    pub fn reload(&self) -> Result<u64, ServiceError> {
        Ok(self.vectors.reload()?)
    }

    pub fn graph_stats(&self) -> GraphStats {
        self.graph.read().stats()
    }

    /// Documents with no inbound links.
    pub fn orphans(&self) -> Vec<String> {
        self.graph.read().orphans()
    }

    /// Non-embed edges that resolve to no document, as (source, target).
    pub fn broken_links(&self) -> Vec<(String, String)> {
        self.graph.read().broken_links()
    }
}
