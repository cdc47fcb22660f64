use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Application, ApplicationPatch, ContentStore, NewApplication, RecordId, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoreFile {
    next_id: u64,
    records: BTreeMap<RecordId, Application>,
}

/// Records kept in one pretty-printed JSON file. The file is read on every
/// access and rewritten on every change; a missing file is an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreFile, StoreError> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(file).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, format!("{json}\n")).map_err(|e| StoreError::io(&self.path, e))?;
        debug!(path = %self.path.display(), records = file.records.len(), "store written");
        Ok(())
    }

    /// All records, ordered by id.
    pub fn list(&self) -> Result<Vec<Application>, StoreError> {
        Ok(self.load()?.records.into_values().collect())
    }
}

impl ContentStore for JsonFileStore {
    fn create(&mut self, app: NewApplication) -> Result<RecordId, StoreError> {
        let mut file = self.load()?;
        file.next_id += 1;
        let id = RecordId(format!("app-{}", file.next_id));
        file.records.insert(id.clone(), app.into_application(id.clone()));
        self.save(&file)?;
        Ok(id)
    }

    fn read(&self, id: &RecordId) -> Result<Option<Application>, StoreError> {
        Ok(self.load()?.records.remove(id))
    }

    fn update(&mut self, id: &RecordId, patch: &ApplicationPatch) -> Result<(), StoreError> {
        let mut file = self.load()?;
        let app = file
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply(app);
        self.save(&file)
    }
}
