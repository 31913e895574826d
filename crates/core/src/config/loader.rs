use std::path::{Path, PathBuf};
use std::{env, fs};

use dirs::home_dir;
use shellexpand::full;
use thiserror::Error;

use crate::config::types::{ConfigFile, ResolvedConfig};

/// Environment variable overriding the configured vault root.
pub const VAULT_ENV_VAR: &str = "MDRECALL_VAULT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to read config file {0}: {1}")]
    ReadError(String, #[source] std::io::Error),

    #[error("failed to parse TOML in {0}: {1}")]
    ParseError(String, #[source] toml::de::Error),

    #[error("version {0} is unsupported (expected 1)")]
    BadVersion(u32),

    #[error("home directory not available to expand '~'")]
    NoHome,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(config_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let s = fs::read_to_string(&path)
            .map_err(|e| ConfigError::ReadError(path.display().to_string(), e))?;

        let cf: ConfigFile = toml::from_str(&s)
            .map_err(|e| ConfigError::ParseError(path.display().to_string(), e))?;

        Self::resolve(cf)
    }

    fn resolve(cf: ConfigFile) -> Result<ResolvedConfig, ConfigError> {
        if cf.version != 1 {
            return Err(ConfigError::BadVersion(cf.version));
        }

        let vault_root = match env::var(VAULT_ENV_VAR) {
            Ok(root) if !root.is_empty() => expand_path(&root)?,
            _ => expand_path(&cf.vault.root)?,
        };

        let excluded_folders =
            cf.vault.excluded_folders.iter().map(PathBuf::from).collect();

        let manifest_path = match &cf.database.path {
            Some(p) => expand_path(p)?,
            None => default_state_dir().join("index.db"),
        };

        Ok(ResolvedConfig {
            vault_root,
            excluded_folders,
            manifest_path,
            search: cf.search,
            logging: cf.logging,
        })
    }
}

pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("mdrecall").join("config.toml");
    }
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("mdrecall").join("config.toml")
}

/// Default directory for the manifest database and other local state.
pub fn default_state_dir() -> PathBuf {
    if let Some(data) = dirs::data_local_dir() {
        return data.join("mdrecall");
    }
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".local").join("share").join("mdrecall")
}

fn expand_path(input: &str) -> Result<PathBuf, ConfigError> {
    let expanded = full(input).map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(expanded.to_string()))
}
