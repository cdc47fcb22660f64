use std::fs;
use std::path::PathBuf;

use super::{check_blob_path, BlobStore, StoreError};

/// Blobs written under a local directory and served from `base_url`.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
    base_url: String,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

impl BlobStore for DirBlobStore {
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        check_blob_path(path)?;
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        fs::write(&target, bytes).map_err(|e| StoreError::io(&target, e))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}
