//! Configuration loading and resolution.

pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, VAULT_ENV_VAR, default_config_path, default_state_dir};
pub use types::{ConfigFile, LoggingConfig, ResolvedConfig, SearchSettings, VaultConfig};
