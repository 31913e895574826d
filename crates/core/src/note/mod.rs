//! Document parsing: frontmatter, wikilinks, tags, titles.

pub mod parser;
pub mod types;

pub use parser::{normalize_path, normalize_target, parse_document};
pub use types::{Document, ReferenceEdge, stem_of};
