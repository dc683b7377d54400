pub mod filter;
pub mod lookup;

use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::core::{RecordId, Result, Value};
use crate::model::EntityType;

pub use filter::{Filter, PropertyFilter};
pub use lookup::BackendLookup;

/// Fired before a property value is stored; listeners may rewrite the value.
pub const BEFORE_SET: &str = "core.before_set";
/// Fired by `Repository::find_by_id`; the first listener to answer wins.
pub const FIND_BY_ID: &str = "core.find_by_id";

/// Payload handed to listeners.
#[derive(Debug)]
pub enum HookEvent<'a> {
    BeforeSet {
        property: &'a str,
        value: &'a mut Value,
    },
    FindById {
        id: RecordId,
    },
}

impl HookEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeSet { .. } => BEFORE_SET,
            Self::FindById { .. } => FIND_BY_ID,
        }
    }
}

/// Where an event was raised.
pub struct HookScope<'a> {
    pub entity_type: &'a EntityType,
    /// Identity of the record the event concerns, if any
    pub id: Option<RecordId>,
}

pub type Listener = Rc<dyn Fn(&HookScope<'_>, &mut HookEvent<'_>) -> Result<Option<Value>>>;

/// An optional capability composed into an entity type.
///
/// `install` runs exactly once per entity type, the first time a record of
/// that type is constructed.
pub trait Feature {
    /// Feature name for logs
    fn name(&self) -> &str;

    /// Register the feature's listeners
    fn install(&self, hooks: &mut HookRegistry);
}

/// Per event name, listeners in registration order
#[derive(Default)]
pub struct HookRegistry {
    listeners: HashMap<String, Vec<Listener>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&mut self, event: &str, listener: Listener) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Snapshot of the listeners for `event`, so dispatch never holds a borrow
    /// of the registry while user code runs.
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.listeners.get(event).cloned().unwrap_or_default()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }
}

/// Invoke every listener in order. Returned values are ignored; the first
/// error stops dispatch and is returned.
pub fn dispatch_all(
    listeners: &[Listener],
    scope: &HookScope<'_>,
    event: &mut HookEvent<'_>,
) -> Result<()> {
    for listener in listeners {
        listener(scope, event)?;
    }
    trace!(
        entity = scope.entity_type.name(),
        event = event.name(),
        listeners = listeners.len(),
        "dispatched to all listeners"
    );
    Ok(())
}

/// Invoke listeners in order until one produces a value.
pub fn dispatch_until_value(
    listeners: &[Listener],
    scope: &HookScope<'_>,
    event: &mut HookEvent<'_>,
) -> Result<Option<Value>> {
    for (position, listener) in listeners.iter().enumerate() {
        if let Some(value) = listener(scope, event)? {
            trace!(
                entity = scope.entity_type.name(),
                event = event.name(),
                position,
                "listener produced a value"
            );
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Wraps a single ad-hoc listener so the builder can treat it as a feature.
pub(crate) struct ListenerFeature {
    pub(crate) event: String,
    pub(crate) listener: Listener,
}

impl Feature for ListenerFeature {
    fn name(&self) -> &str {
        &self.event
    }

    fn install(&self, hooks: &mut HookRegistry) {
        hooks.listen(&self.event, self.listener.clone());
    }
}
