//! Remote storage behind a trait. The firm's Dropbox is an external
//! collaborator; what ships here is the folder mirror used on-premises and
//! in tests. The policy either way: a remote failure after a successful
//! local generation degrades to a warning on the record, never a rollback.

use crate::error::ServiceError;
use std::fs;
use std::path::{Path, PathBuf};

pub trait RemoteStore {
    /// Stores a local file under `folder/filename` and returns the remote
    /// path recorded on the document.
    fn store(&self, local: &Path, folder: &str, filename: &str) -> Result<String, ServiceError>;
}

/// Mirrors outputs into a directory tree under the configured remote root.
pub struct FolderMirror {
    root: PathBuf,
}

impl FolderMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FolderMirror { root: root.into() }
    }
}

impl RemoteStore for FolderMirror {
    fn store(&self, local: &Path, folder: &str, filename: &str) -> Result<String, ServiceError> {
        let clean: PathBuf = folder
            .split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .collect();
        let dir = self.root.join(clean);
        fs::create_dir_all(&dir).map_err(|e| {
            ServiceError::RemoteStorage(format!("cannot create remote folder: {}", e))
        })?;
        let dest = dir.join(filename);
        fs::copy(local, &dest)
            .map_err(|e| ServiceError::RemoteStorage(format!("cannot mirror output: {}", e)))?;
        Ok(dest.to_string_lossy().into_owned())
    }
}
