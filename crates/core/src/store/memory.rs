//! In-process vector store and deterministic embedder.
//!
//! [`InMemoryCollection`] models the visibility semantics of persistent
//! stores backed by a write-ahead log: each opened handle snapshots the
//! collection, reads from its snapshot, and writes through to both the
//! snapshot and the shared backing. A handle therefore always sees its own
//! writes but never another handle's later writes until it is reopened —
//! exactly the staleness [`EpochHandle`](super::EpochHandle) exists to
//! manage.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{
    EmbeddingService, StoreError, VectorFilter, VectorHit, VectorMetadata,
    VectorStore, VectorStoreProvider,
};
use crate::lexical::tokenize;

#[derive(Debug, Clone)]
struct StoredRecord {
    vector: Vec<f32>,
    metadata: VectorMetadata,
}

type Records = HashMap<String, StoredRecord>;

/// Shared backing collection; cheap to clone.
#[derive(Clone, Default)]
pub struct InMemoryCollection {
    records: Arc<RwLock<Records>>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records currently committed to the backing collection.
    pub fn committed_count(&self) -> usize {
        self.records.read().len()
    }
}

/// Provider opening snapshot-at-acquisition handles over a collection.
pub struct InMemoryProvider {
    collection: InMemoryCollection,
}

impl InMemoryProvider {
    pub fn new(collection: InMemoryCollection) -> Self {
        Self { collection }
    }
}

impl VectorStoreProvider for InMemoryProvider {
    fn open(&self) -> Result<Box<dyn VectorStore>, StoreError> {
        let snapshot = self.collection.records.read().clone();
        Ok(Box::new(InMemoryStore {
            backing: self.collection.clone(),
            snapshot: RwLock::new(snapshot),
        }))
    }
}

struct InMemoryStore {
    backing: InMemoryCollection,
    snapshot: RwLock<Records>,
}

impl VectorStore for InMemoryStore {
    fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: &VectorMetadata,
    ) -> Result<(), StoreError> {
        if vector.is_empty() {
            return Err(StoreError::Backend("empty vector".to_string()));
        }
        let record =
            StoredRecord { vector: vector.to_vec(), metadata: metadata.clone() };
        self.snapshot.write().insert(id.to_string(), record.clone());
        self.backing.records.write().insert(id.to_string(), record);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.snapshot.write().remove(id);
        self.backing.records.write().remove(id);
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<VectorHit>, StoreError> {
        let snapshot = self.snapshot.read();

        let mut hits: Vec<VectorHit> = snapshot
            .iter()
            .filter(|(_, record)| {
                filter.is_none_or(|f| f.matches(&record.metadata))
            })
            .map(|(id, record)| VectorHit {
                id: id.clone(),
                path: record.metadata.path.clone(),
                distance: cosine_distance(vector, &record.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.path.cmp(&b.path))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    fn fetch(&self, id: &str) -> Result<Option<Vec<f32>>, StoreError> {
        Ok(self.snapshot.read().get(id).map(|r| r.vector.clone()))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.snapshot.read().len())
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Deterministic bag-of-words embedder.
///
/// Hashes tokens into a fixed number of buckets and L2-normalises the
/// result. Not a semantic model; a stand-in with the right call contract
/// for tests and offline use.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EmbeddingService for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        use std::hash::{DefaultHasher, Hash, Hasher};

        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimensions;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(path: &str, tags: &[&str]) -> VectorMetadata {
        VectorMetadata {
            path: path.to_string(),
            title: path.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            content_hash: "h".to_string(),
        }
    }

    fn open(collection: &InMemoryCollection) -> Box<dyn VectorStore> {
        InMemoryProvider::new(collection.clone()).open().unwrap()
    }

    #[test]
    fn query_orders_by_distance() {
        let collection = InMemoryCollection::new();
        let store = open(&collection);

        store.upsert("a", &[1.0, 0.0], &meta("a.md", &[])).unwrap();
        store.upsert("b", &[0.0, 1.0], &meta("b.md", &[])).unwrap();
        store.upsert("c", &[0.7, 0.7], &meta("c.md", &[])).unwrap();

        let hits = store.query(&[1.0, 0.0], 10, None).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].path, "a.md");
        assert_eq!(hits[1].path, "c.md");
        assert_eq!(hits[2].path, "b.md");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn query_applies_metadata_filter() {
        let collection = InMemoryCollection::new();
        let store = open(&collection);

        store.upsert("a", &[1.0, 0.0], &meta("work/a.md", &["x"])).unwrap();
        store.upsert("b", &[1.0, 0.0], &meta("home/b.md", &["x"])).unwrap();

        let filter = VectorFilter {
            path_prefix: Some("work".to_string()),
            ..Default::default()
        };
        let hits = store.query(&[1.0, 0.0], 10, Some(&filter)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "work/a.md");
    }

    #[test]
    fn snapshot_isolation_between_handles() {
        let collection = InMemoryCollection::new();
        let older = open(&collection);
        let writer = open(&collection);

        writer.upsert("a", &[1.0], &meta("a.md", &[])).unwrap();

        assert_eq!(older.count().unwrap(), 0);
        assert_eq!(writer.count().unwrap(), 1);
        assert_eq!(collection.committed_count(), 1);

        // A handle opened after the write observes it.
        assert_eq!(open(&collection).count().unwrap(), 1);
    }

    #[test]
    fn hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::new(32);
        let a = embedder.embed("alpha beta gamma").unwrap();
        let b = embedder.embed("alpha beta gamma").unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn similar_texts_are_closer() {
        let embedder = HashingEmbedder::new(64);
        let base = embedder.embed("rust borrow checker ownership").unwrap();
        let near = embedder.embed("rust ownership rules").unwrap();
        let far = embedder.embed("sourdough starter hydration").unwrap();

        assert!(
            cosine_distance(&base, &near) < cosine_distance(&base, &far)
        );
    }
}
