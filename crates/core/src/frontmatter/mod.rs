//! Frontmatter parsing.
//!
//! Splits the leading `---` metadata block from markdown documents and
//! parses it as YAML while preserving key order. Malformed blocks degrade
//! to "no frontmatter" via [`parse_lenient`] so indexing never stops on a
//! single bad document.

pub mod parser;
pub mod types;

pub use parser::{FrontmatterParseError, parse, parse_lenient};
pub use types::{Frontmatter, ParsedDocument};
