use tracing::trace;

use super::Record;
use crate::core::{RecordError, Result, Value};
use crate::hooks::HookEvent;
use crate::model::{Accessor, EntityType};

fn association_misuse(entity_type: &EntityType, property: &str) -> RecordError {
    RecordError::InvalidArgument(format!(
        "{}::{} is an association; resolve it with related()",
        entity_type.name(),
        property
    ))
}

impl Record {
    /// Read a property.
    ///
    /// The identity property never triggers a load. Other reads of an
    /// identified record load it first, so `RecordNotFound` surfaces here
    /// rather than at construction. Declared properties that were never
    /// assigned read as `Value::Null`. Anything else, including a property
    /// of a schema that was never discovered, is `UndefinedProperty`.
    pub fn get(&self, property: &str) -> Result<Value> {
        let entity_type = self.entity_type();

        if property == entity_type.id_property() {
            return Ok(Value::from(self.id()));
        }

        match entity_type.accessor(property) {
            Some(Accessor::Custom {
                getter: Some(getter),
                ..
            }) => return getter(self),
            Some(Accessor::Association(_)) => {
                return Err(association_misuse(&entity_type, property));
            }
            _ => {}
        }

        self.ensure_loaded()?;

        if let Some(value) = self.inner.borrow().data.get(property) {
            return Ok(value.clone());
        }

        // Reads never discover fields; only a schema already known counts.
        match entity_type.resolved_schema() {
            Some(schema) if schema.contains(property) => Ok(Value::Null),
            _ => Err(RecordError::undefined_property(entity_type.name(), property)),
        }
    }

    /// Assign a property and mark it dirty.
    ///
    /// Identified records are loaded first and accept only properties present
    /// in their loaded data. New records accept any property of the schema,
    /// discovering it from the backend if it was not declared. Before-set
    /// listeners run on the value before it is stored.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        let mut value = value.into();
        let entity_type = self.entity_type();

        if property == entity_type.id_property() {
            return Err(RecordError::InvalidArgument(format!(
                "The identity of {} is assigned by its backend",
                entity_type.name()
            )));
        }

        match entity_type.accessor(property) {
            Some(Accessor::Custom {
                setter: Some(setter),
                ..
            }) => return setter(self, value),
            Some(Accessor::Association(_)) => {
                return Err(association_misuse(&entity_type, property));
            }
            _ => {}
        }

        let id = self.id();
        if id.is_some() {
            self.ensure_loaded()?;
            if !self.inner.borrow().data.contains_key(property) {
                return Err(RecordError::undefined_property(entity_type.name(), property));
            }
        } else {
            let instance_backend = self.inner.borrow().backend.clone();
            let schema = entity_type.schema(instance_backend.as_ref())?;
            if !schema.contains(property) {
                return Err(RecordError::undefined_property(entity_type.name(), property));
            }
        }

        entity_type.dispatch_all(
            id,
            &mut HookEvent::BeforeSet {
                property,
                value: &mut value,
            },
        )?;

        self.store(property, value);
        Ok(())
    }

    fn store(&self, property: &str, value: Value) {
        let mut state = self.inner.borrow_mut();
        trace!(
            entity = state.entity_type.name(),
            id = ?state.id,
            property,
            "property stored"
        );
        state.data.insert(property.to_string(), value);
        state.dirty.mark(property);
    }
}
