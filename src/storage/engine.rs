use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use tracing::debug;

use crate::core::{PropertyMap, RecordError, RecordId, Result, Value};

/// A write handed to a backend by `Record::save`.
#[derive(Debug, Clone, Copy)]
pub enum SaveRequest<'a> {
    /// The record has no identity yet; the backend must assign one.
    Insert {
        storage: &'a str,
        values: &'a PropertyMap,
    },
    /// Only the dirty properties of an identified record.
    Update {
        storage: &'a str,
        id: RecordId,
        values: &'a PropertyMap,
    },
}

impl SaveRequest<'_> {
    pub fn storage(&self) -> &str {
        match self {
            Self::Insert { storage, .. } | Self::Update { storage, .. } => storage,
        }
    }

    pub fn values(&self) -> &PropertyMap {
        match self {
            Self::Insert { values, .. } | Self::Update { values, .. } => values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted(RecordId),
    Updated { affected: usize },
}

/// Storage engine contract - allows pluggable persistence backends
pub trait PersistenceBackend: Send + Sync {
    /// Backend name, used in logs and error messages
    fn name(&self) -> &str;

    /// Insert or update a row
    fn save(&self, request: SaveRequest<'_>) -> Result<SaveOutcome>;

    /// Fetch the row stored under `id`, failing with `RecordNotFound`
    fn load(&self, storage: &str, id: RecordId) -> Result<PropertyMap>;

    /// Fetch the row again, bypassing anything the backend may cache
    fn reload(&self, storage: &str, id: RecordId) -> Result<PropertyMap> {
        self.load(storage, id)
    }

    /// Remove the row and report how many rows were affected
    fn delete(&self, storage: &str, id: RecordId) -> Result<usize>;

    /// List the property names the storage knows for `storage`
    fn discover_fields(&self, storage: &str) -> Result<Vec<String>>;

    /// Check whether a row exists without loading it
    fn exists(&self, storage: &str, id: RecordId) -> Result<bool> {
        match self.load(storage, id) {
            Ok(_) => Ok(true),
            Err(RecordError::RecordNotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Rows whose `property` equals `value`, in identity order
    fn find_by(
        &self,
        storage: &str,
        property: &str,
        _value: &Value,
    ) -> Result<Vec<(RecordId, PropertyMap)>> {
        Err(RecordError::UnsupportedOperation(format!(
            "Backend '{}' cannot search {} by {}",
            self.name(),
            storage,
            property
        )))
    }
}

pub type BackendHandle = Arc<dyn PersistenceBackend>;

lazy_static! {
    static ref GLOBAL_BACKEND: RwLock<Option<BackendHandle>> = RwLock::new(None);
}

/// Set (or clear with `None`) the process-wide default backend.
pub fn set_global_backend(backend: Option<BackendHandle>) -> Result<()> {
    let mut slot = GLOBAL_BACKEND.write()?;
    if let Some(backend) = &backend {
        debug!(backend = backend.name(), "global default backend configured");
    }
    *slot = backend;
    Ok(())
}

pub fn global_backend() -> Result<Option<BackendHandle>> {
    Ok(GLOBAL_BACKEND.read()?.clone())
}

/// Walks instance → entity type → global and returns the first backend found.
pub fn resolve_backend(
    instance: Option<&BackendHandle>,
    type_default: Option<BackendHandle>,
    entity: &str,
) -> Result<BackendHandle> {
    if let Some(backend) = instance {
        return Ok(backend.clone());
    }
    if let Some(backend) = type_default {
        return Ok(backend);
    }
    global_backend()?.ok_or_else(|| {
        RecordError::Config(format!(
            "Please configure a persistence backend to use with {}",
            entity
        ))
    })
}
