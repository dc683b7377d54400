//! Persistence lifecycle of a record.
//!
//! ```text
//! New ──save──> Loaded <──load── IdentifiedUnloaded
//!                │  ▲
//!            set │  │ save / reload
//!                ▼  │
//!               Dirty
//!
//! Loaded / Dirty ──delete──> Deleted ──load──> Loaded (if the row came back)
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::Record;
use crate::core::{PropertyMap, RecordError, RecordId, Result};
use crate::model::EntityType;
use crate::storage::{BackendHandle, SaveOutcome, SaveRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Never persisted; in-memory data is authoritative
    New,
    /// Identity known, nothing read yet
    IdentifiedUnloaded,
    /// Data mirrors the backend
    Loaded,
    /// Loaded, with pending changes
    Dirty,
    /// Removed from the backend; identity retained
    Deleted,
}

impl LifecycleState {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Loaded | Self::Dirty | Self::IdentifiedUnloaded)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "NEW",
            Self::IdentifiedUnloaded => "IDENTIFIED_UNLOADED",
            Self::Loaded => "LOADED",
            Self::Dirty => "DIRTY",
            Self::Deleted => "DELETED",
        };
        f.write_str(label)
    }
}

impl Record {
    pub fn state(&self) -> LifecycleState {
        let state = self.inner.borrow();
        if state.deleted {
            LifecycleState::Deleted
        } else if state.id.is_none() {
            LifecycleState::New
        } else if !state.loaded {
            LifecycleState::IdentifiedUnloaded
        } else if state.dirty.is_clean() {
            LifecycleState::Loaded
        } else {
            LifecycleState::Dirty
        }
    }

    /// Load when the record has an identity but no trusted data.
    pub(crate) fn ensure_loaded(&self) -> Result<()> {
        let needs_load = {
            let state = self.inner.borrow();
            state.id.is_some() && !state.loaded
        };
        if needs_load { self.load() } else { Ok(()) }
    }

    /// Populate the data map from the backend. A no-op once loaded.
    pub fn load(&self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        let (entity_type, instance, id) = self.persistence_parts("load")?;
        let backend = entity_type.backend(instance.as_ref())?;

        let row = backend
            .load(entity_type.storage_name(), id)
            .map_err(|err| not_found_as(&entity_type, err))?;
        debug!(entity = %entity_type.name(), %id, backend = backend.name(), "record loaded");

        self.apply_loaded(&entity_type, row);
        Ok(())
    }

    /// Persist pending changes.
    ///
    /// A new record is inserted with its dirty declared properties and
    /// registered under the identity the backend assigns. An identified
    /// record must be loaded; only its dirty properties are written, and
    /// nothing is written when it is clean.
    pub fn save(&self) -> Result<()> {
        match self.id() {
            None => self.insert(),
            Some(id) => self.update(id),
        }
    }

    fn insert(&self) -> Result<()> {
        let (entity_type, instance) = self.backend_parts();
        let backend = entity_type.backend(instance.as_ref())?;
        let schema = entity_type.schema(instance.as_ref())?;

        let values = {
            let state = self.inner.borrow();
            state.dirty.write_set(&state.data, Some(&schema))
        };

        let outcome = backend.save(SaveRequest::Insert {
            storage: entity_type.storage_name(),
            values: &values,
        })?;
        let SaveOutcome::Inserted(id) = outcome else {
            return Err(RecordError::PersistenceFailure(format!(
                "Backend '{}' did not assign an identity to the new {}",
                backend.name(),
                entity_type.name()
            )));
        };
        debug!(
            entity = %entity_type.name(),
            %id,
            backend = backend.name(),
            properties = values.len(),
            "record inserted"
        );

        let identity_map = {
            let mut state = self.inner.borrow_mut();
            state.id = Some(id);
            state.loaded = true;
            state.deleted = false;
            state.dirty.clear();
            for name in schema.names() {
                state.data.entry(name.to_string()).or_default();
            }
            state.identity_map.upgrade()
        };

        if let Some(identity_map) = identity_map {
            identity_map.register(&entity_type, id, self.clone());
        }
        Ok(())
    }

    fn update(&self, id: RecordId) -> Result<()> {
        let (entity_type, instance) = self.backend_parts();

        let values = {
            let state = self.inner.borrow();
            if !state.loaded {
                return Err(RecordError::NotLoaded {
                    entity: entity_type.name().to_string(),
                    id,
                });
            }
            state.dirty.write_set(&state.data, None)
        };

        if values.is_empty() {
            trace!(entity = %entity_type.name(), %id, "clean record, nothing to write");
            return Ok(());
        }

        let backend = entity_type.backend(instance.as_ref())?;
        let outcome = backend.save(SaveRequest::Update {
            storage: entity_type.storage_name(),
            id,
            values: &values,
        })?;
        match outcome {
            SaveOutcome::Updated { affected } if affected > 0 => {}
            _ => {
                return Err(RecordError::PersistenceFailure(format!(
                    "Backend '{}' updated no {} with identity {}",
                    backend.name(),
                    entity_type.name(),
                    id
                )));
            }
        }
        debug!(
            entity = %entity_type.name(),
            %id,
            backend = backend.name(),
            properties = values.len(),
            "record updated"
        );

        self.inner.borrow_mut().dirty.clear();
        Ok(())
    }

    /// Discard in-memory changes and read the record again.
    ///
    /// The data is dropped before the backend is asked, so a failed reload
    /// leaves the record unloaded and the next read tries again.
    pub fn reload(&self) -> Result<()> {
        if !self.is_loaded() {
            return self.load();
        }
        let (entity_type, instance, id) = self.persistence_parts("reload")?;
        {
            let mut state = self.inner.borrow_mut();
            state.data.clear();
            state.dirty.clear();
            state.loaded = false;
        }
        let backend = entity_type.backend(instance.as_ref())?;

        let row = backend
            .reload(entity_type.storage_name(), id)
            .map_err(|err| not_found_as(&entity_type, err))?;
        debug!(entity = %entity_type.name(), %id, backend = backend.name(), "record reloaded");

        self.apply_loaded(&entity_type, row);
        Ok(())
    }

    /// Remove the record from its backend.
    ///
    /// The handle stays registered and keeps its identity; the next read
    /// loads it again, which fails with `RecordNotFound` unless the row was
    /// recreated.
    pub fn delete(&self) -> Result<()> {
        let (entity_type, instance, id) = self.persistence_parts("delete")?;
        let backend = entity_type.backend(instance.as_ref())?;

        let affected = backend.delete(entity_type.storage_name(), id)?;
        if affected == 0 {
            return Err(RecordError::PersistenceFailure(format!(
                "Backend '{}' deleted no {} with identity {}",
                backend.name(),
                entity_type.name(),
                id
            )));
        }
        debug!(entity = %entity_type.name(), %id, backend = backend.name(), "record deleted");

        let mut state = self.inner.borrow_mut();
        state.loaded = false;
        state.deleted = true;
        state.data.clear();
        state.dirty.clear();
        Ok(())
    }

    fn persistence_parts(
        &self,
        operation: &'static str,
    ) -> Result<(Rc<EntityType>, Option<BackendHandle>, RecordId)> {
        let state = self.inner.borrow();
        let id = state
            .id
            .ok_or_else(|| RecordError::missing_identity(state.entity_type.name(), operation))?;
        Ok((state.entity_type.clone(), state.backend.clone(), id))
    }

    /// Replace the data map with a backend row.
    pub(crate) fn apply_loaded(&self, entity_type: &EntityType, mut row: PropertyMap) {
        row.remove(entity_type.id_property());
        if let Some(schema) = entity_type.resolved_schema() {
            for name in schema.names() {
                row.entry(name.to_string()).or_default();
            }
        }

        let mut state = self.inner.borrow_mut();
        state.data = row;
        state.dirty.clear();
        state.loaded = true;
        state.deleted = false;
    }
}

fn not_found_as(entity_type: &EntityType, err: RecordError) -> RecordError {
    match err {
        RecordError::RecordNotFound { id, .. } => RecordError::not_found(entity_type.name(), id),
        other => other,
    }
}
