//! Recursive vault directory walker.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum VaultWalkerError {
    #[error("vault root does not exist: {0}")]
    MissingRoot(String),

    #[error("failed to walk vault directory {0}: {1}")]
    WalkError(String, #[source] walkdir::Error),

    #[error("failed to read file metadata {0}: {1}")]
    MetadataError(String, #[source] std::io::Error),
}

/// Information about a discovered markdown file.
#[derive(Debug, Clone)]
pub struct WalkedFile {
    /// Absolute path to the file.
    pub absolute_path: PathBuf,
    /// Path relative to vault root.
    pub relative_path: PathBuf,
    /// File modification time.
    pub modified: SystemTime,
}

/// Walker for discovering markdown files in a vault.
#[derive(Debug)]
pub struct VaultWalker {
    root: PathBuf,
    /// Folders to exclude from walking (relative paths from vault root).
    excluded_folders: Vec<PathBuf>,
}

impl VaultWalker {
    /// Create a new walker for the given vault root.
    pub fn new(root: &Path) -> Result<Self, VaultWalkerError> {
        Self::with_exclusions(root, Vec::new())
    }

    /// Create a new walker with folder exclusions.
    ///
    /// Excluded folders can be specified as relative paths from the vault
    /// root, or absolute paths (converted to relative).
    pub fn with_exclusions(
        root: &Path,
        excluded_folders: Vec<PathBuf>,
    ) -> Result<Self, VaultWalkerError> {
        let root = root
            .canonicalize()
            .map_err(|_| VaultWalkerError::MissingRoot(root.display().to_string()))?;

        if !root.exists() {
            return Err(VaultWalkerError::MissingRoot(root.display().to_string()));
        }

        // Normalize exclusions to be relative to root
        let excluded_folders = excluded_folders
            .into_iter()
            .map(|p| {
                if p.is_absolute() {
                    p.strip_prefix(&root).unwrap_or(&p).to_path_buf()
                } else {
                    p
                }
            })
            .collect();

        Ok(Self { root, excluded_folders })
    }

    /// Walk the vault and return all markdown files, sorted by relative path.
    /// Hidden directories (`.obsidian`, `.trash`, `.git`, ...) and configured
    /// exclusions are skipped.
    pub fn walk(&self) -> Result<Vec<WalkedFile>, VaultWalkerError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e))
        {
            let entry = entry.map_err(|e| {
                VaultWalkerError::WalkError(self.root.display().to_string(), e)
            })?;

            let path = entry.path();
            if !path.is_file() || !is_markdown_file(path) {
                continue;
            }

            let metadata = path.metadata().map_err(|e| {
                VaultWalkerError::MetadataError(path.display().to_string(), e)
            })?;

            let relative_path =
                path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();

            files.push(WalkedFile {
                absolute_path: path.to_path_buf(),
                relative_path,
                modified: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(files)
    }

    /// Check if an entry should be excluded from walking.
    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        // Never filter the root directory (depth 0)
        if entry.depth() == 0 {
            return false;
        }

        let name = entry.file_name().to_string_lossy();

        // Skip hidden files and directories (covers .obsidian, .trash, .git)
        if name.starts_with('.') {
            return true;
        }

        // Skip common non-vault directories
        if matches!(name.as_ref(), "node_modules" | "target" | "__pycache__" | "venv") {
            return true;
        }

        // Check against configured exclusions
        if !self.excluded_folders.is_empty()
            && let Ok(relative) = entry.path().strip_prefix(&self.root)
        {
            for excluded in &self.excluded_folders {
                if relative.starts_with(excluded) {
                    return true;
                }
            }
        }

        false
    }

    /// Get the vault root path.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_markdown_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e == "md")
}
