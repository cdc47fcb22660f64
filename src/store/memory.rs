use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use super::{
    check_blob_path, Application, ApplicationPatch, BlobStore, ContentStore, NewApplication,
    RecordId, StoreError,
};

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<RecordId, Application>,
    next_id: u64,
    failures: VecDeque<String>,
    updates: Vec<(RecordId, ApplicationPatch)>,
}

/// In-memory record store. Clones share state, so a test can keep a handle
/// while the host owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue failures for upcoming updates, one per message.
    pub fn fail_next_updates<I, S>(&self, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .borrow_mut()
            .failures
            .extend(messages.into_iter().map(Into::into));
    }

    /// Every update attempted so far, failed ones included.
    pub fn updates(&self) -> Vec<(RecordId, ApplicationPatch)> {
        self.inner.borrow().updates.clone()
    }

    pub fn record(&self, id: &RecordId) -> Option<Application> {
        self.inner.borrow().records.get(id).cloned()
    }
}

impl ContentStore for MemoryStore {
    fn create(&mut self, app: NewApplication) -> Result<RecordId, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = RecordId(format!("app-{}", inner.next_id));
        inner.records.insert(id.clone(), app.into_application(id.clone()));
        Ok(id)
    }

    fn read(&self, id: &RecordId) -> Result<Option<Application>, StoreError> {
        Ok(self.record(id))
    }

    fn update(&mut self, id: &RecordId, patch: &ApplicationPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.updates.push((id.clone(), patch.clone()));
        if let Some(message) = inner.failures.pop_front() {
            return Err(StoreError::Unavailable(message));
        }
        let app = inner
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply(app);
        Ok(())
    }
}

/// In-memory blob store; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.borrow().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.blobs.borrow().keys().cloned().collect()
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        check_blob_path(path)?;
        self.blobs.borrow_mut().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::upload_file;

    #[test]
    fn test_create_read_update() {
        let mut store = MemoryStore::new();
        let id = store
            .create(NewApplication {
                name: "Notes".to_string(),
                ..NewApplication::default()
            })
            .unwrap();
        assert_eq!(id.as_str(), "app-1");
        store
            .update(&id, &ApplicationPatch::long_description("<p>x</p>"))
            .unwrap();
        let app = store.read(&id).unwrap().unwrap();
        assert_eq!(app.long_description, "<p>x</p>");
        assert_eq!(app.name, "Notes");
    }

    #[test]
    fn test_injected_failures_are_consumed_in_order() {
        let mut store = MemoryStore::new();
        let id = store.create(NewApplication::default()).unwrap();
        store.fail_next_updates(["first", "second"]);
        let patch = ApplicationPatch::long_description("<p></p>");
        let err = store.update(&id, &patch).unwrap_err();
        assert_eq!(err.to_string(), "store unavailable: first");
        assert!(store.update(&id, &patch).is_err());
        assert!(store.update(&id, &patch).is_ok());
        assert_eq!(store.updates().len(), 3);
    }

    #[test]
    fn test_update_missing_record() {
        let mut store = MemoryStore::new();
        let err = store
            .update(&RecordId::new("nope"), &ApplicationPatch::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_upload_file_into_memory_blobs() {
        let mut blobs = MemoryBlobStore::new();
        let url = upload_file(&mut blobs, "shot.jpg", b"jpeg").unwrap();
        assert!(url.starts_with("memory://images/"));
        assert!(url.ends_with(".jpg"));
        assert_eq!(blobs.paths().len(), 1);
    }
}
