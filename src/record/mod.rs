//! Record handles and their state.
//!
//! A `Record` is a cheap, clonable handle; clones share one underlying state,
//! which is what lets the identity map hand the same instance to every caller
//! asking for a given identity.

pub mod dirty;
pub mod lifecycle;
mod resolver;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::association::Related;
use crate::core::{PropertyMap, RecordError, RecordId, Result, Value};
use crate::model::{Accessor, EntityType};
use crate::registry::IdentityMap;
use crate::storage::BackendHandle;

pub use dirty::DirtyTracker;
pub use lifecycle::LifecycleState;

pub(crate) struct RecordState {
    entity_type: Rc<EntityType>,
    identity_map: Weak<IdentityMap>,
    id: Option<RecordId>,
    data: PropertyMap,
    dirty: DirtyTracker,
    loaded: bool,
    deleted: bool,
    backend: Option<BackendHandle>,
    locals: PropertyMap,
}

#[derive(Clone)]
pub struct Record {
    inner: Rc<RefCell<RecordState>>,
}

impl Record {
    fn with_state(
        entity_type: Rc<EntityType>,
        identity_map: Weak<IdentityMap>,
        id: Option<RecordId>,
    ) -> Self {
        entity_type.initialize_once();
        Self {
            inner: Rc::new(RefCell::new(RecordState {
                entity_type,
                identity_map,
                id,
                data: PropertyMap::new(),
                dirty: DirtyTracker::new(),
                loaded: false,
                deleted: false,
                backend: None,
                locals: PropertyMap::new(),
            })),
        }
    }

    /// A new, unpersisted record.
    pub(crate) fn blank(entity_type: Rc<EntityType>, identity_map: Weak<IdentityMap>) -> Self {
        Self::with_state(entity_type, identity_map, None)
    }

    /// A record known only by identity. Nothing is read until first access.
    pub(crate) fn identified(
        entity_type: Rc<EntityType>,
        identity_map: Weak<IdentityMap>,
        id: RecordId,
    ) -> Self {
        Self::with_state(entity_type, identity_map, Some(id))
    }

    pub fn entity_type(&self) -> Rc<EntityType> {
        self.inner.borrow().entity_type.clone()
    }

    /// Identity, or `None` while the record has never been saved.
    pub fn id(&self) -> Option<RecordId> {
        self.inner.borrow().id
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.borrow().loaded
    }

    pub fn is_dirty(&self) -> bool {
        !self.inner.borrow().dirty.is_clean()
    }

    pub fn is_property_dirty(&self, property: &str) -> bool {
        self.inner.borrow().dirty.is_dirty(property)
    }

    pub fn dirty_properties(&self) -> Vec<String> {
        self.inner.borrow().dirty.properties()
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Use `backend` for this instance only, or fall back to the type and
    /// global defaults again with `None`.
    pub fn set_backend(&self, backend: Option<BackendHandle>) {
        self.inner.borrow_mut().backend = backend;
    }

    /// The backend this record would use right now.
    pub fn backend(&self) -> Result<BackendHandle> {
        let (entity_type, instance) = self.backend_parts();
        entity_type.backend(instance.as_ref())
    }

    pub(crate) fn backend_parts(&self) -> (Rc<EntityType>, Option<BackendHandle>) {
        let state = self.inner.borrow();
        (state.entity_type.clone(), state.backend.clone())
    }

    /// Value kept outside the data map, for custom accessors. Never persisted
    /// and never dirty.
    pub fn local(&self, name: &str) -> Value {
        self.inner
            .borrow()
            .locals
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_local(&self, name: &str, value: impl Into<Value>) {
        self.inner
            .borrow_mut()
            .locals
            .insert(name.to_string(), value.into());
    }

    /// Every stored property, loading first when needed.
    pub fn values(&self) -> Result<PropertyMap> {
        self.ensure_loaded()?;
        Ok(self.inner.borrow().data.clone())
    }

    /// Plain JSON object with the identity and every stored property.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let values = self.values()?;
        let state = self.inner.borrow();
        let mut object = serde_json::Map::new();
        object.insert(
            state.entity_type.id_property().to_string(),
            Value::from(state.id).to_json(),
        );
        for (name, value) in &values {
            object.insert(name.clone(), value.to_json());
        }
        Ok(serde_json::Value::Object(object))
    }

    /// Resolve the association named `name`.
    pub fn related(&self, name: &str) -> Result<Related> {
        let entity_type = self.entity_type();
        match entity_type.accessor(name) {
            Some(Accessor::Association(association)) => association.resolve(self),
            _ => Err(RecordError::InvalidArgument(format!(
                "{} has no association named '{}'",
                entity_type.name(),
                name
            ))),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(state) => f
                .debug_struct("Record")
                .field("entity", &state.entity_type.name())
                .field("id", &state.id)
                .field("loaded", &state.loaded)
                .field("data", &state.data)
                .field("dirty", &state.dirty.properties())
                .finish(),
            Err(_) => f.debug_struct("Record").finish_non_exhaustive(),
        }
    }
}
