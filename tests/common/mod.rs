//! Shared test helpers

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use memorecord::{
    MemoryBackend, PersistenceBackend, PropertyMap, RecordId, Result, SaveOutcome, SaveRequest,
    Value,
};

/// A write the backend received.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendWrite {
    Insert(PropertyMap),
    Update(RecordId, PropertyMap),
}

/// Memory backend that counts every call.
pub struct CountingBackend {
    inner: MemoryBackend,
    loads: AtomicUsize,
    deletes: AtomicUsize,
    discoveries: AtomicUsize,
    writes: Mutex<Vec<BackendWrite>>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::wrap(MemoryBackend::named("counting"))
    }

    pub fn wrap(inner: MemoryBackend) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            discoveries: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn memory(&self) -> &MemoryBackend {
        &self.inner
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<BackendWrite> {
        self.writes.lock().unwrap().clone()
    }
}

impl PersistenceBackend for CountingBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn save(&self, request: SaveRequest<'_>) -> Result<SaveOutcome> {
        let write = match request {
            SaveRequest::Insert { values, .. } => BackendWrite::Insert(values.clone()),
            SaveRequest::Update { id, values, .. } => BackendWrite::Update(id, values.clone()),
        };
        self.writes.lock().unwrap().push(write);
        self.inner.save(request)
    }

    fn load(&self, storage: &str, id: RecordId) -> Result<PropertyMap> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(storage, id)
    }

    fn delete(&self, storage: &str, id: RecordId) -> Result<usize> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(storage, id)
    }

    fn discover_fields(&self, storage: &str) -> Result<Vec<String>> {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        self.inner.discover_fields(storage)
    }

    fn exists(&self, storage: &str, id: RecordId) -> Result<bool> {
        self.inner.exists(storage, id)
    }

    fn find_by(
        &self,
        storage: &str,
        property: &str,
        value: &Value,
    ) -> Result<Vec<(RecordId, PropertyMap)>> {
        self.inner.find_by(storage, property, value)
    }
}

pub fn props<V: Into<Value>>(pairs: impl IntoIterator<Item = (&'static str, V)>) -> PropertyMap {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.into()))
        .collect()
}
