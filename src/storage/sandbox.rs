//! Per-user sandbox directory
//!
//! Every file operation in a session resolves inside
//! `<storage root>/<username>/`. Basename extraction is the sole defense
//! against path traversal: whatever directory components a client supplies
//! are discarded before the path touches the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Handle to one user's sandbox directory.
#[derive(Debug, Clone)]
pub struct Sandbox {
    dir: PathBuf,
}

impl Sandbox {
    /// Opens (creating if necessary) the sandbox for `username`.
    pub fn open(storage_root: &Path, username: &str) -> std::io::Result<Self> {
        let dir = storage_root.join(username);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolves a client-supplied name to a path inside the sandbox.
    ///
    /// Reduces the raw name to its basename; names with no extractable
    /// basename (empty, `.`, `..`, a trailing `/..`) are rejected.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, StorageError> {
        let trimmed = raw.trim();
        let basename = Path::new(trimmed)
            .file_name()
            .ok_or_else(|| StorageError::InvalidFilename(trimmed.to_string()))?;
        Ok(self.dir.join(basename))
    }

    /// Non-recursive listing of the sandbox, sorted for determinism.
    pub fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Deletes the named file. Returns the resolved basename on success.
    /// Irreversible; there is no confirmation step.
    pub fn delete(&self, raw: &str) -> Result<String, StorageError> {
        let path = self.resolve(raw)?;
        if !path.is_file() {
            return Err(StorageError::FileNotFound(raw.trim().to_string()));
        }
        fs::remove_file(&path)?;
        Ok(path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default())
    }
}
