//! Incremental indexing engine.
//!
//! One pass walks the vault, diffs content hashes against the manifest,
//! and brings the lexical index, catalog, wikilink graph, vector store and
//! manifest up to date. Deletions are applied before additions so a
//! renamed document never transiently collides with its old path. The
//! pass never aborts on a single bad document: per-document problems
//! become [`IndexWarning`]s in the returned report.

pub mod report;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;

use crate::catalog::DocumentCatalog;
use crate::graph::WikilinkGraph;
use crate::lexical::LexicalIndex;
use crate::manifest::{ManifestDb, ManifestEntry, ManifestError};
use crate::note::{Document, parse_document};
use crate::store::{
    EmbeddingService, EpochHandle, StoreError, VectorMetadata,
};
use crate::vault::{
    VaultWalker, VaultWalkerError, WalkedFile, content_hash_str, record_id,
};

pub use report::{IndexReport, IndexWarning, WarningKind};

/// Upper bound on the text handed to the embedding service.
const MAX_EMBED_BYTES: usize = 32_000;

/// Stand-in text embedded for documents with no body, so every indexed
/// document has a vector record.
const EMPTY_BODY_PLACEHOLDER: &str = "[empty note]";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Walker(#[from] VaultWalkerError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Drives indexing passes over one vault.
///
/// The in-memory structures are shared with the retriever through locks;
/// each is held only for the single document being written, so searches
/// interleave with an ongoing pass and observe per-document-atomic state.
pub struct IndexingEngine {
    root: PathBuf,
    excluded_folders: Vec<PathBuf>,
    manifest: ManifestDb,
    lexical: Arc<RwLock<LexicalIndex>>,
    catalog: Arc<RwLock<DocumentCatalog>>,
    graph: Arc<RwLock<WikilinkGraph>>,
    vectors: Arc<EpochHandle>,
    embedder: Arc<dyn EmbeddingService>,
}

impl IndexingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root: PathBuf,
        excluded_folders: Vec<PathBuf>,
        manifest: ManifestDb,
        lexical: Arc<RwLock<LexicalIndex>>,
        catalog: Arc<RwLock<DocumentCatalog>>,
        graph: Arc<RwLock<WikilinkGraph>>,
        vectors: Arc<EpochHandle>,
        embedder: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            root,
            excluded_folders,
            manifest,
            lexical,
            catalog,
            graph,
            vectors,
            embedder,
        }
    }

    /// Run one indexing pass.
    ///
    /// Incremental (`full = false`) re-indexes only documents whose content
    /// hash differs from the manifest; `full = true` rebuilds everything
    /// from scratch, ignoring stored hashes.
    pub fn reindex(&self, full: bool) -> Result<IndexReport, EngineError> {
        let started = Instant::now();
        let mut report = IndexReport::default();

        let walker =
            VaultWalker::with_exclusions(&self.root, self.excluded_folders.clone())?;
        let files = walker.walk()?;
        let manifest = self.manifest.load_all()?;

        let live: BTreeMap<String, &WalkedFile> = files
            .iter()
            .map(|f| {
                (f.relative_path.to_string_lossy().replace('\\', "/"), f)
            })
            .collect();

        if full {
            self.lexical.write().clear();
            self.catalog.write().clear();
            self.graph.write().clear();
        }

        // Deletions first, so an add at a recycled path never races a
        // stale record.
        for (path, entry) in &manifest {
            if live.contains_key(path) {
                continue;
            }
            match self.vectors.with(|s| s.delete(&entry.vector_id)) {
                Ok(()) => {
                    self.lexical.write().remove(path);
                    self.catalog.write().remove(path);
                    self.graph.write().remove(path);
                    self.manifest.remove(path)?;
                    report.deleted += 1;
                    tracing::debug!(path, "document removed");
                }
                Err(e) => {
                    tracing::warn!(path, error = %e, "deletion incomplete");
                    report.warn(path, WarningKind::Deletion, e.to_string());
                }
            }
        }

        for (path, file) in &live {
            let raw = match fs::read_to_string(&file.absolute_path) {
                Ok(raw) => raw,
                Err(e) => {
                    report.warn(
                        path,
                        WarningKind::Parse,
                        format!("failed to read file: {e}"),
                    );
                    continue;
                }
            };
            let hash = content_hash_str(&raw);
            let previous = manifest.get(path.as_str());
            let up_to_date =
                !full && previous.is_some_and(|e| e.content_hash == hash);

            if up_to_date {
                report.skipped += 1;
                // After a restart the manifest is current but this
                // process's in-memory structures are empty. Hydrate from
                // the file without touching the vector side.
                if !self.lexical.read().contains(path) {
                    self.apply_in_memory(&parse_document(
                        path,
                        &raw,
                        file.modified.into(),
                    ));
                    tracing::debug!(path, "hydrated from manifest");
                }
                continue;
            }

            let doc = parse_document(path, &raw, file.modified.into());
            for w in &doc.warnings {
                report.warn(path, WarningKind::Parse, w.clone());
            }

            self.apply_in_memory(&doc);

            match self.upsert_vector(&doc) {
                Ok(()) => {
                    self.manifest.upsert(&ManifestEntry {
                        path: path.clone(),
                        content_hash: doc.content_hash.clone(),
                        indexed_at: Utc::now(),
                        vector_id: record_id(path),
                    })?;
                    if previous.is_some() {
                        report.updated += 1;
                    } else {
                        report.added += 1;
                    }
                }
                // Manifest entry withheld: the stored hash still
                // mismatches, so the next pass retries the vector side.
                Err(e) => {
                    tracing::warn!(path, error = %e, "vector upsert failed");
                    report.warn(path, WarningKind::PartialIndex, e.to_string());
                }
            }
        }

        let recorded = self.manifest.len()?;
        if recorded != live.len() {
            report.warn(
                "",
                WarningKind::Verification,
                format!(
                    "manifest records {recorded} documents, vault has {}",
                    live.len()
                ),
            );
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            added = report.added,
            updated = report.updated,
            deleted = report.deleted,
            skipped = report.skipped,
            warnings = report.warnings.len(),
            full,
            "indexing pass finished"
        );
        Ok(report)
    }

    fn apply_in_memory(&self, doc: &Document) {
        self.lexical.write().add_or_replace(&doc.path, &doc.body);
        self.catalog.write().insert(doc);
        self.graph.write().add_or_replace(
            &doc.path,
            &doc.title,
            doc.links.clone(),
        );
    }

    fn upsert_vector(&self, doc: &Document) -> Result<(), StoreError> {
        let vector = self.embedder.embed(embedding_text(&doc.body))?;
        let metadata = VectorMetadata {
            path: doc.path.clone(),
            title: doc.title.clone(),
            tags: doc.tags.iter().cloned().collect(),
            content_hash: doc.content_hash.clone(),
        };
        self.vectors
            .with(|s| s.upsert(&record_id(&doc.path), &vector, &metadata))
    }
}

/// Body text as handed to the embedding service: placeholder for empty
/// bodies, truncated at a char boundary otherwise.
fn embedding_text(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return EMPTY_BODY_PLACEHOLDER;
    }
    if trimmed.len() <= MAX_EMBED_BYTES {
        return trimmed;
    }
    let mut end = MAX_EMBED_BYTES;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        HashingEmbedder, InMemoryCollection, InMemoryProvider,
    };
    use parking_lot::Mutex;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _vault: TempDir,
        root: PathBuf,
        collection: InMemoryCollection,
        engine: IndexingEngine,
    }

    fn fixture_with_embedder(
        embedder: Arc<dyn EmbeddingService>,
    ) -> Fixture {
        let vault = TempDir::new().unwrap();
        let root = vault.path().to_path_buf();
        let collection = InMemoryCollection::new();
        let provider = Arc::new(InMemoryProvider::new(collection.clone()));
        let engine = IndexingEngine::new(
            root.clone(),
            Vec::new(),
            ManifestDb::open_in_memory().unwrap(),
            Arc::new(RwLock::new(LexicalIndex::new())),
            Arc::new(RwLock::new(DocumentCatalog::new())),
            Arc::new(RwLock::new(WikilinkGraph::new())),
            Arc::new(EpochHandle::open(provider).unwrap()),
            embedder,
        );
        Fixture { _vault: vault, root, collection, engine }
    }

    fn fixture() -> Fixture {
        fixture_with_embedder(Arc::new(HashingEmbedder::default()))
    }

    #[test]
    fn first_pass_adds_everything() {
        let fx = fixture();
        fs::write(fx.root.join("a.md"), "# A\n\nLinks to [[b]].").unwrap();
        fs::write(fx.root.join("b.md"), "# B\n\nPlain body.").unwrap();

        let report = fx.engine.reindex(false).unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(report.deleted, 0);
        assert!(report.warnings.is_empty());
        assert_eq!(fx.collection.committed_count(), 2);
    }

    #[test]
    fn second_pass_is_a_noop() {
        let fx = fixture();
        fs::write(fx.root.join("a.md"), "# A\n\nBody.").unwrap();

        fx.engine.reindex(false).unwrap();
        let report = fx.engine.reindex(false).unwrap();

        assert!(report.is_noop());
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn edit_triggers_update() {
        let fx = fixture();
        let path = fx.root.join("a.md");
        fs::write(&path, "# A\n\nfirst").unwrap();
        fx.engine.reindex(false).unwrap();

        fs::write(&path, "# A\n\nsecond").unwrap();
        let report = fx.engine.reindex(false).unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.added, 0);
        // Same record id, so the store still holds one record.
        assert_eq!(fx.collection.committed_count(), 1);
    }

    #[test]
    fn removed_file_is_deleted_everywhere() {
        let fx = fixture();
        let path = fx.root.join("a.md");
        fs::write(&path, "# A\n\nbody").unwrap();
        fs::write(fx.root.join("b.md"), "# B\n\nbody").unwrap();
        fx.engine.reindex(false).unwrap();

        fs::remove_file(&path).unwrap();
        let report = fx.engine.reindex(false).unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(fx.collection.committed_count(), 1);
        assert!(!fx.engine.lexical.read().contains("a.md"));
        assert!(!fx.engine.graph.read().contains("a.md"));
        assert_eq!(fx.engine.manifest.len().unwrap(), 1);
    }

    struct FlakyEmbedder {
        fail: Mutex<bool>,
        inner: HashingEmbedder,
    }

    impl EmbeddingService for FlakyEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
            if *self.fail.lock() {
                return Err(StoreError::Embedding("unavailable".to_string()));
            }
            self.inner.embed(text)
        }
    }

    #[test]
    fn embed_failure_indexes_lexically_and_retries() {
        let embedder = Arc::new(FlakyEmbedder {
            fail: Mutex::new(true),
            inner: HashingEmbedder::default(),
        });
        let fx = fixture_with_embedder(embedder.clone());
        fs::write(fx.root.join("a.md"), "# A\n\nbody").unwrap();

        let report = fx.engine.reindex(false).unwrap();
        assert_eq!(report.added, 0);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::PartialIndex));
        // Lexically searchable despite the missing vector.
        assert!(fx.engine.lexical.read().contains("a.md"));
        assert_eq!(fx.collection.committed_count(), 0);

        *embedder.fail.lock() = false;
        let report = fx.engine.reindex(false).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(fx.collection.committed_count(), 1);
    }

    #[test]
    fn hydrates_in_memory_state_after_restart() {
        let vault = TempDir::new().unwrap();
        let root = vault.path().to_path_buf();
        let db_dir = TempDir::new().unwrap();
        let db_path = db_dir.path().join("manifest.db");
        fs::write(root.join("a.md"), "# A\n\nbody [[b]]").unwrap();

        let collection = InMemoryCollection::new();
        let make = |manifest: ManifestDb| {
            IndexingEngine::new(
                root.clone(),
                Vec::new(),
                manifest,
                Arc::new(RwLock::new(LexicalIndex::new())),
                Arc::new(RwLock::new(DocumentCatalog::new())),
                Arc::new(RwLock::new(WikilinkGraph::new())),
                Arc::new(
                    EpochHandle::open(Arc::new(InMemoryProvider::new(
                        collection.clone(),
                    )))
                    .unwrap(),
                ),
                Arc::new(HashingEmbedder::default())
                    as Arc<dyn EmbeddingService>,
            )
        };

        let first = make(ManifestDb::open(&db_path).unwrap());
        assert_eq!(first.reindex(false).unwrap().added, 1);

        // Fresh engine with empty in-memory state over the same manifest.
        let second = make(ManifestDb::open(&db_path).unwrap());
        let report = second.reindex(false).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.skipped, 1);
        assert!(second.lexical.read().contains("a.md"));
        assert!(second.graph.read().contains("a.md"));
    }

    #[test]
    fn full_rebuild_reindexes_everything() {
        let fx = fixture();
        fs::write(fx.root.join("a.md"), "# A\n\nbody").unwrap();
        fx.engine.reindex(false).unwrap();

        let report = fx.engine.reindex(true).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn empty_body_gets_placeholder_text() {
        assert_eq!(embedding_text("   \n\n"), "[empty note]");
        assert_eq!(embedding_text("hello"), "hello");

        let long = "ä".repeat(MAX_EMBED_BYTES);
        let out = embedding_text(&long);
        assert!(out.len() <= MAX_EMBED_BYTES);
        assert!(out.chars().all(|c| c == 'ä'));
    }
}
