//! Persistence collaborators.
//!
//! The editor never talks to storage directly: the host drives a
//! [`ContentStore`] for application records, a [`BlobStore`] for uploaded
//! images and an [`AuthProvider`] that gates mounting.

mod auth;
mod blob;
mod json_file;
mod memory;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use auth::{EnvAuth, StaticAuth, SESSION_ENV};
pub use blob::DirBlobStore;
pub use json_file::JsonFileStore;
pub use memory::{MemoryBlobStore, MemoryStore};

/// Directory uploaded images land in.
pub const IMAGE_PREFIX: &str = "images";

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A storefront application record. `long_description` holds serialized
/// rich-text markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Application {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub long_description: String,
    pub version: String,
    pub size: String,
    pub image_url: String,
    pub download_url: String,
    pub screenshots: Vec<String>,
    pub featured: bool,
    pub editors_choice: bool,
    pub category: String,
    pub publisher: String,
}

/// Fields for a record about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewApplication {
    pub name: String,
    pub description: String,
    pub long_description: String,
    pub version: String,
    pub size: String,
    pub image_url: String,
    pub download_url: String,
    pub screenshots: Vec<String>,
    pub featured: bool,
    pub editors_choice: bool,
    pub category: String,
    pub publisher: String,
}

impl NewApplication {
    pub fn into_application(self, id: RecordId) -> Application {
        Application {
            id,
            name: self.name,
            description: self.description,
            long_description: self.long_description,
            version: self.version,
            size: self.size,
            image_url: self.image_url,
            download_url: self.download_url,
            screenshots: self.screenshots,
            featured: self.featured,
            editors_choice: self.editors_choice,
            category: self.category,
            publisher: self.publisher,
        }
    }
}

/// A partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub version: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub download_url: Option<String>,
    pub screenshots: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub editors_choice: Option<bool>,
    pub category: Option<String>,
    pub publisher: Option<String>,
}

impl ApplicationPatch {
    /// The patch autosave sends.
    pub fn long_description(html: impl Into<String>) -> Self {
        Self {
            long_description: Some(html.into()),
            ..Self::default()
        }
    }

    pub fn apply(&self, app: &mut Application) {
        fn set<T: Clone>(field: &mut T, value: Option<&T>) {
            if let Some(value) = value {
                field.clone_from(value);
            }
        }
        set(&mut app.name, self.name.as_ref());
        set(&mut app.description, self.description.as_ref());
        set(&mut app.long_description, self.long_description.as_ref());
        set(&mut app.version, self.version.as_ref());
        set(&mut app.size, self.size.as_ref());
        set(&mut app.image_url, self.image_url.as_ref());
        set(&mut app.download_url, self.download_url.as_ref());
        set(&mut app.screenshots, self.screenshots.as_ref());
        set(&mut app.featured, self.featured.as_ref());
        set(&mut app.editors_choice, self.editors_choice.as_ref());
        set(&mut app.category, self.category.as_ref());
        set(&mut app.publisher, self.publisher.as_ref());
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed store file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid blob path '{0}'")]
    InvalidPath(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub trait ContentStore {
    fn create(&mut self, app: NewApplication) -> Result<RecordId, StoreError>;
    fn read(&self, id: &RecordId) -> Result<Option<Application>, StoreError>;
    fn update(&mut self, id: &RecordId, patch: &ApplicationPatch) -> Result<(), StoreError>;
}

pub trait BlobStore {
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;
    fn public_url(&self, path: &str) -> String;
}

pub trait AuthProvider {
    fn has_session(&self) -> bool;
}

/// Store an uploaded file under a content-derived name, keeping its
/// extension, and return its public URL.
pub fn upload_file(
    blobs: &mut dyn BlobStore,
    file_name: &str,
    bytes: &[u8],
) -> Result<String, StoreError> {
    let path = blob_path(file_name, bytes);
    blobs.upload(&path, bytes)?;
    Ok(blobs.public_url(&path))
}

/// Name a blob by the first eight bytes of its SHA-256 digest.
fn blob_path(file_name: &str, bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let hash: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{IMAGE_PREFIX}/{hash}.{}", ext.to_ascii_lowercase()),
        None => format!("{IMAGE_PREFIX}/{hash}"),
    }
}

/// Reject absolute paths and parent-directory components.
pub(crate) fn check_blob_path(path: &str) -> Result<(), StoreError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|part| part == ".." || part.is_empty());
    if bad {
        Err(StoreError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_path_keeps_extension_and_is_stable() {
        let a = blob_path("Screen Shot.PNG", b"pixels");
        let b = blob_path("other.png", b"pixels");
        assert_eq!(a, b);
        assert!(a.starts_with("images/"));
        assert!(a.ends_with(".png"));
        assert_ne!(a, blob_path("x.png", b"different"));
        assert!(!blob_path("noext", b"x").contains('.'));
    }

    #[test]
    fn test_blob_path_matches_sha256_prefix() {
        assert_eq!(blob_path("a.png", b"abc"), "images/ba7816bf8f01cfea.png");
        assert_eq!(blob_path("a", b"abc"), "images/ba7816bf8f01cfea");
    }

    #[test]
    fn test_check_blob_path() {
        assert!(check_blob_path("images/a.png").is_ok());
        assert!(check_blob_path("../etc/passwd").is_err());
        assert!(check_blob_path("/abs").is_err());
        assert!(check_blob_path("a//b").is_err());
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut app = NewApplication {
            name: "Notes".to_string(),
            version: "1.0".to_string(),
            ..NewApplication::default()
        }
        .into_application(RecordId::new("app-1"));
        ApplicationPatch::long_description("<p>hi</p>").apply(&mut app);
        assert_eq!(app.long_description, "<p>hi</p>");
        assert_eq!(app.name, "Notes");
        assert_eq!(app.version, "1.0");
    }

    #[test]
    fn test_application_json_uses_camel_case() {
        let app = Application {
            editors_choice: true,
            ..Application::default()
        };
        let json = serde_json::to_string(&app).unwrap();
        assert!(json.contains("\"editorsChoice\":true"));
        let back: Application = serde_json::from_str(r#"{"name":"X"}"#).unwrap();
        assert_eq!(back.name, "X");
    }
}
