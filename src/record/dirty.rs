use std::collections::BTreeSet;

use crate::core::{PropertyMap, PropertySchema};

/// Names of the properties modified since the last load or save.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty: BTreeSet<String>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag `property`. No value comparison: every store counts.
    pub fn mark(&mut self, property: &str) {
        self.dirty.insert(property.to_string());
    }

    pub fn is_dirty(&self, property: &str) -> bool {
        self.dirty.contains(property)
    }

    pub fn is_clean(&self) -> bool {
        self.dirty.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn properties(&self) -> Vec<String> {
        self.dirty.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.dirty.clear();
    }

    /// Dirty properties with their current values. With a schema, only
    /// declared properties are included.
    pub fn write_set(&self, data: &PropertyMap, schema: Option<&PropertySchema>) -> PropertyMap {
        let mut values = PropertyMap::new();
        match schema {
            Some(schema) => {
                for name in schema.names().filter(|name| self.dirty.contains(*name)) {
                    values.insert(name.to_string(), data.get(name).cloned().unwrap_or_default());
                }
            }
            None => {
                for name in &self.dirty {
                    values.insert(name.clone(), data.get(name).cloned().unwrap_or_default());
                }
            }
        }
        values
    }
}
