//! Content hashing for change detection and vector record ids.

use std::fs::File;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::{BufRead, BufReader, Result};
use std::path::Path;

/// Compute a hash of file content for change detection.
/// Uses DefaultHasher for speed (non-cryptographic, fast).
/// Returns hex-encoded hash string.
pub fn content_hash(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut hasher = DefaultHasher::new();

    for line in reader.lines() {
        let line = line?;
        line.hash(&mut hasher);
    }

    Ok(format!("{:016x}", hasher.finish()))
}

/// Compute hash from content already in memory.
pub fn content_hash_str(content: &str) -> String {
    let mut hasher = DefaultHasher::new();

    for line in content.lines() {
        line.hash(&mut hasher);
    }

    format!("{:016x}", hasher.finish())
}

/// Deterministic vector-store record id for a vault-relative path.
///
/// Derived from the path, not the content, so re-indexing a changed
/// document overwrites its record instead of accumulating duplicates.
pub fn record_id(path: &str) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("note-{:016x}", hasher.finish())
}
