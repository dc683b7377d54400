use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use tracing::trace;

use super::{Catalog, PersistenceBackend, SaveOutcome, SaveRequest};
use crate::core::{PropertyMap, RecordError, RecordId, Result, Value};

type Rows = BTreeMap<RecordId, PropertyMap>;

/// Simple, volatile map storage, useful for testing.
///
/// Rows live under their storage name; identities come from a per-backend
/// sequence starting at 1. Field discovery works only for storages defined
/// through `with_table`/`define_table`.
pub struct MemoryBackend {
    name: String,
    tables: RwLock<HashMap<String, Rows>>,
    catalog: RwLock<Catalog>,
    next_id: AtomicI64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: RwLock::new(HashMap::new()),
            catalog: RwLock::new(Catalog::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn with_table<I, S>(self, storage: impl Into<String>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.define_table(storage, columns)?;
        Ok(self)
    }

    /// Register the column list reported by `discover_fields` for `storage`.
    pub fn define_table<I, S>(&self, storage: impl Into<String>, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = self.catalog.write()?;
        let updated = catalog.clone().with_table(storage, columns)?;
        *catalog = updated;
        Ok(())
    }

    /// Store a row directly, bypassing any record, and return its identity.
    pub fn insert_row(&self, storage: &str, row: PropertyMap) -> Result<RecordId> {
        let id = self.allocate_id();
        let mut tables = self.tables.write()?;
        tables.entry(storage.to_string()).or_default().insert(id, row);
        Ok(id)
    }

    /// Copy of the stored row, if any.
    pub fn row(&self, storage: &str, id: RecordId) -> Result<Option<PropertyMap>> {
        let tables = self.tables.read()?;
        Ok(tables.get(storage).and_then(|rows| rows.get(&id)).cloned())
    }

    pub fn row_count(&self, storage: &str) -> Result<usize> {
        let tables = self.tables.read()?;
        Ok(tables.get(storage).map_or(0, BTreeMap::len))
    }

    /// Drop every stored row. Table definitions and the id sequence are kept.
    pub fn clear(&self) -> Result<()> {
        self.tables.write()?.clear();
        Ok(())
    }

    fn allocate_id(&self) -> RecordId {
        RecordId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceBackend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn save(&self, request: SaveRequest<'_>) -> Result<SaveOutcome> {
        match request {
            SaveRequest::Insert { storage, values } => {
                let id = self.insert_row(storage, values.clone())?;
                trace!(storage, %id, "memory insert");
                Ok(SaveOutcome::Inserted(id))
            }
            SaveRequest::Update {
                storage,
                id,
                values,
            } => {
                let mut tables = self.tables.write()?;
                let Some(row) = tables.get_mut(storage).and_then(|rows| rows.get_mut(&id)) else {
                    return Ok(SaveOutcome::Updated { affected: 0 });
                };
                for (key, value) in values {
                    row.insert(key.clone(), value.clone());
                }
                trace!(storage, %id, columns = values.len(), "memory update");
                Ok(SaveOutcome::Updated { affected: 1 })
            }
        }
    }

    fn load(&self, storage: &str, id: RecordId) -> Result<PropertyMap> {
        self.row(storage, id)?
            .ok_or_else(|| RecordError::not_found(storage, id))
    }

    fn delete(&self, storage: &str, id: RecordId) -> Result<usize> {
        let mut tables = self.tables.write()?;
        let removed = tables
            .get_mut(storage)
            .and_then(|rows| rows.remove(&id))
            .is_some();
        Ok(usize::from(removed))
    }

    fn discover_fields(&self, storage: &str) -> Result<Vec<String>> {
        let catalog = self.catalog.read()?;
        catalog.columns(storage).map(<[String]>::to_vec).ok_or_else(|| {
            RecordError::UnsupportedOperation(format!(
                "Backend '{}' cannot discover fields of '{}' without a table definition",
                self.name, storage
            ))
        })
    }

    fn exists(&self, storage: &str, id: RecordId) -> Result<bool> {
        let tables = self.tables.read()?;
        Ok(tables.get(storage).is_some_and(|rows| rows.contains_key(&id)))
    }

    fn find_by(
        &self,
        storage: &str,
        property: &str,
        value: &Value,
    ) -> Result<Vec<(RecordId, PropertyMap)>> {
        let tables = self.tables.read()?;
        let Some(rows) = tables.get(storage) else {
            return Ok(Vec::new());
        };

        Ok(rows
            .iter()
            .filter(|(_, row)| row.get(property).unwrap_or(&Value::Null) == value)
            .map(|(id, row)| (*id, row.clone()))
            .collect())
    }
}
