use std::path::PathBuf;

use serde::Deserialize;

use crate::retriever::{FusionConfig, SearchConfig};

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    pub vault: VaultConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct VaultConfig {
    pub root: String,
    /// Folders to exclude from indexing (relative to the vault root).
    #[serde(default)]
    pub excluded_folders: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Manifest database location. Defaults to `index.db` inside the
    /// state directory.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SearchSettings {
    #[serde(default = "default_lexical_depth")]
    pub lexical_depth: usize,
    #[serde(default = "default_vector_depth")]
    pub vector_depth: usize,
    #[serde(default = "default_rerank_shortlist")]
    pub rerank_shortlist: usize,
    #[serde(default = "default_rrf_constant")]
    pub rrf_constant: f32,
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            lexical_depth: default_lexical_depth(),
            vector_depth: default_vector_depth(),
            rerank_shortlist: default_rerank_shortlist(),
            rrf_constant: default_rrf_constant(),
            vector_weight: default_vector_weight(),
            lexical_weight: default_lexical_weight(),
        }
    }
}

impl SearchSettings {
    pub fn to_search_config(self) -> SearchConfig {
        SearchConfig {
            lexical_depth: self.lexical_depth,
            vector_depth: self.vector_depth,
            rerank_shortlist: self.rerank_shortlist,
            fusion: FusionConfig {
                constant: self.rrf_constant,
                vector_weight: self.vector_weight,
                lexical_weight: self.lexical_weight,
            },
        }
    }
}

fn default_lexical_depth() -> usize {
    50
}

fn default_vector_depth() -> usize {
    50
}

fn default_rerank_shortlist() -> usize {
    20
}

fn default_rrf_constant() -> f32 {
    60.0
}

fn default_vector_weight() -> f32 {
    0.7
}

fn default_lexical_weight() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub vault_root: PathBuf,
    pub excluded_folders: Vec<PathBuf>,
    pub manifest_path: PathBuf,
    pub search: SearchSettings,
    pub logging: LoggingConfig,
}
