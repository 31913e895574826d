//! Vault file discovery and content hashing.
//!
//! This module provides utilities for walking vault directories and
//! computing the content hashes the incremental indexer keys on.

pub mod hasher;
pub mod walker;

pub use hasher::{content_hash, content_hash_str, record_id};
pub use walker::{VaultWalker, VaultWalkerError, WalkedFile};
