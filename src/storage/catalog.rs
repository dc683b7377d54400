use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{RecordError, Result};

/// Column lists known to a backend, keyed by storage name.
///
/// Immutable after creation: `with_table` returns a new catalog and leaves the
/// old one untouched, so clones are cheap and never need a lock.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Arc<HashMap<String, Vec<String>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table<I, S>(self, storage: impl Into<String>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let storage = storage.into();
        if self.tables.contains_key(&storage) {
            return Err(RecordError::Config(format!(
                "Table '{}' is already defined",
                storage
            )));
        }

        let mut tables = (*self.tables).clone();
        tables.insert(storage, columns.into_iter().map(Into::into).collect());
        Ok(Self {
            tables: Arc::new(tables),
        })
    }

    pub fn columns(&self, storage: &str) -> Option<&[String]> {
        self.tables.get(storage).map(Vec::as_slice)
    }
}
