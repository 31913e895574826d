//! Indexing pass reports.

use serde::{Deserialize, Serialize};

/// What went sideways for one document, without failing the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Document indexed with best-effort fields (e.g. malformed
    /// frontmatter).
    Parse,
    /// Document indexed lexically but not in the vector store; retried on
    /// the next incremental pass.
    PartialIndex,
    /// Deletion could not be fully applied; retried on the next pass.
    Deletion,
    /// Post-pass consistency check failed.
    Verification,
}

/// One recorded warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexWarning {
    pub path: String,
    pub kind: WarningKind,
    pub message: String,
}

/// Summary of one indexing pass. Never silent: returned even when some
/// documents failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexReport {
    /// Documents indexed for the first time.
    pub added: usize,
    /// Documents re-indexed because their content hash changed.
    pub updated: usize,
    /// Documents removed because their file disappeared.
    pub deleted: usize,
    /// Documents already up to date.
    pub skipped: usize,
    /// Per-document warnings accumulated during the pass.
    pub warnings: Vec<IndexWarning>,
    /// Pass duration in milliseconds.
    pub duration_ms: u64,
}

impl IndexReport {
    pub fn warn(&mut self, path: &str, kind: WarningKind, message: impl Into<String>) {
        self.warnings.push(IndexWarning {
            path: path.to_string(),
            kind,
            message: message.into(),
        });
    }

    /// Whether the pass changed anything.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.deleted == 0
    }
}
