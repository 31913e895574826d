//! Epoch-counted vector store handle.
//!
//! A process holding an open handle to a persisted collection may not see
//! writes made through another process's handle until the handle is
//! refreshed. Instead of leaving that as an implicit caching quirk, every
//! handle here carries an epoch counter: [`reload`](EpochHandle::reload)
//! bumps the epoch and reacquires the handle from the provider, making
//! staleness an explicit, testable invariant.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{StoreError, VectorStore, VectorStoreProvider};

struct HandleState {
    epoch: u64,
    store: Box<dyn VectorStore>,
}

/// Shared, reloadable handle to a vector store.
pub struct EpochHandle {
    provider: Arc<dyn VectorStoreProvider>,
    state: RwLock<HandleState>,
}

impl EpochHandle {
    /// Acquire the initial handle (epoch 1).
    pub fn open(provider: Arc<dyn VectorStoreProvider>) -> Result<Self, StoreError> {
        let store = provider.open()?;
        Ok(Self { provider, state: RwLock::new(HandleState { epoch: 1, store }) })
    }

    /// Current handle epoch.
    pub fn epoch(&self) -> u64 {
        self.state.read().epoch
    }

    /// Reacquire the handle and bump the epoch. Subsequent reads observe
    /// everything committed to the collection before this call.
    pub fn reload(&self) -> Result<u64, StoreError> {
        // Open outside the write lock so readers are blocked only for the
        // swap itself.
        let fresh = self.provider.open()?;
        let mut state = self.state.write();
        state.store = fresh;
        state.epoch += 1;
        tracing::debug!(epoch = state.epoch, "vector store handle reacquired");
        Ok(state.epoch)
    }

    /// Run a closure against the current handle under a shared lock.
    pub fn with<T>(
        &self,
        f: impl FnOnce(&dyn VectorStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let state = self.state.read();
        f(state.store.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{InMemoryCollection, InMemoryProvider};
    use crate::store::VectorMetadata;

    fn meta(path: &str) -> VectorMetadata {
        VectorMetadata {
            path: path.to_string(),
            title: path.to_string(),
            tags: Vec::new(),
            content_hash: "h".to_string(),
        }
    }

    #[test]
    fn stale_handle_misses_foreign_writes_until_reload() {
        let collection = InMemoryCollection::new();
        let provider = Arc::new(InMemoryProvider::new(collection.clone()));

        let reader = EpochHandle::open(provider.clone()).unwrap();
        assert_eq!(reader.epoch(), 1);

        // A second handle (another "process") writes to the collection.
        let writer = provider.open().unwrap();
        writer.upsert("id1", &[1.0, 0.0], &meta("a.md")).unwrap();

        // The reader's snapshot predates the write.
        assert_eq!(reader.with(|s| s.count()).unwrap(), 0);

        let epoch = reader.reload().unwrap();
        assert_eq!(epoch, 2);
        assert_eq!(reader.with(|s| s.count()).unwrap(), 1);
    }

    #[test]
    fn own_writes_are_always_visible() {
        let provider =
            Arc::new(InMemoryProvider::new(InMemoryCollection::new()));
        let handle = EpochHandle::open(provider).unwrap();

        handle
            .with(|s| s.upsert("id1", &[1.0, 0.0], &meta("a.md")))
            .unwrap();
        assert_eq!(handle.with(|s| s.count()).unwrap(), 1);
    }
}
