#![deny(clippy::all)]

//! Hybrid lexical + semantic retrieval over a markdown note vault.
//!
//! The crate indexes a vault of markdown documents into four coordinated
//! structures (BM25 lexical index, document catalog, wikilink graph,
//! vector store) plus a durable manifest for incremental change
//! detection, and answers hybrid searches by fusing lexical and vector
//! rankings. [`VaultService`] is the entry point.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod frontmatter;
pub mod graph;
pub mod lexical;
pub mod manifest;
pub mod note;
pub mod retriever;
pub mod service;
pub mod store;
pub mod vault;

pub use catalog::SearchFilters;
pub use engine::{IndexReport, IndexWarning, WarningKind};
pub use graph::GraphStats;
pub use retriever::{SearchConfig, SearchHit};
pub use service::{ServiceError, VaultService};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
