//! Index manifest: durable record of what has been indexed.
//!
//! A document is up to date iff its current content hash equals the hash
//! stored here; that comparison is the sole signal the incremental pass
//! uses to decide re-indexing.

pub mod db;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use db::{ManifestDb, ManifestError, SCHEMA_VERSION};

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Vault-relative document path.
    pub path: String,
    /// Content hash at last successful index.
    pub content_hash: String,
    /// When the document was last indexed.
    pub indexed_at: DateTime<Utc>,
    /// Record id in the vector store.
    pub vector_id: String,
}
