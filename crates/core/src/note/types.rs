//! Parsed document types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frontmatter::Frontmatter;

/// An outbound reference extracted from a document body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceEdge {
    /// Target as written: a title or a vault-relative path, `.md` stripped.
    pub target: String,
    /// Display alias (`[[target|alias]]`).
    pub alias: Option<String>,
    /// Section anchor (`[[target#section]]`).
    pub section: Option<String>,
    /// Embedded-content reference (`![[target]]`). Embeds are not
    /// navigable and never count as backlinks.
    pub embed: bool,
}

/// A fully parsed vault document.
///
/// Produced deterministically: the same input text always yields identical
/// fields. Tags are a sorted set; links keep first-occurrence order.
#[derive(Debug, Clone)]
pub struct Document {
    /// Vault-relative path (unique identity, case-sensitive).
    pub path: String,
    /// Title: frontmatter `title` > first `#` heading > file stem.
    pub title: String,
    /// Raw file content.
    pub raw: String,
    /// Body text with the frontmatter block removed.
    pub body: String,
    /// Frontmatter, if present and well-formed.
    pub frontmatter: Option<Frontmatter>,
    /// Outbound references, in order of first occurrence.
    pub links: Vec<ReferenceEdge>,
    /// Tags from inline `#tag` tokens and the frontmatter `tags:` field.
    pub tags: BTreeSet<String>,
    /// Content hash used for change detection.
    pub content_hash: String,
    /// File modification time.
    pub modified: DateTime<Utc>,
    /// Non-fatal parse warnings (malformed frontmatter, ...).
    pub warnings: Vec<String>,
}

impl Document {
    /// Folder part of the path ("" for root-level documents).
    pub fn folder(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// File stem (filename without the `.md` extension).
    pub fn stem(&self) -> &str {
        stem_of(&self.path)
    }
}

/// File stem of a vault-relative path.
pub fn stem_of(path: &str) -> &str {
    let name = path.rsplit_once('/').map_or(path, |(_, name)| name);
    name.strip_suffix(".md").unwrap_or(name)
}
