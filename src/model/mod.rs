pub mod accessor;

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::association::{Association, AssociationKind};
use crate::config::EntityConfig;
use crate::core::{PropertyDecl, PropertySchema, RecordError, RecordId, Result, Value};
use crate::hooks::{
    self, BackendLookup, Feature, HookEvent, HookRegistry, HookScope, Listener, ListenerFeature,
};
use crate::record::Record;
use crate::repository::Repository;
use crate::storage::{BackendHandle, resolve_backend};

pub use accessor::{Accessor, Getter, Setter};

/// Everything the core knows about one kind of record: declared schema,
/// accessor dispatch table, features and the type-level backend.
pub struct EntityType {
    name: String,
    storage_name: String,
    config: EntityConfig,
    schema: OnceCell<Rc<PropertySchema>>,
    accessors: HashMap<String, Accessor>,
    features: Vec<Box<dyn Feature>>,
    hooks: RefCell<HookRegistry>,
    initialized: Cell<bool>,
    default_backend: RefCell<Option<BackendHandle>>,
}

impl EntityType {
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn id_property(&self) -> &str {
        &self.config.id_property
    }

    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    pub fn accessor(&self, property: &str) -> Option<&Accessor> {
        self.accessors.get(property)
    }

    /// The schema if it was declared or already discovered.
    pub fn resolved_schema(&self) -> Option<Rc<PropertySchema>> {
        self.schema.get().cloned()
    }

    /// The schema, discovering it from the backend on first use when it was
    /// not declared. `instance_backend` takes part in backend resolution.
    pub fn schema(&self, instance_backend: Option<&BackendHandle>) -> Result<Rc<PropertySchema>> {
        if let Some(schema) = self.schema.get() {
            return Ok(schema.clone());
        }

        if !self.config.discover_fields {
            return Err(RecordError::Config(format!(
                "Missing property configuration for {}",
                self.name
            )));
        }

        let backend = self.backend(instance_backend)?;
        let fields = backend.discover_fields(&self.storage_name)?;
        let id_property = self.id_property();
        let schema = PropertySchema::from_names(
            fields.into_iter().filter(|field| field != id_property),
        );
        debug!(
            entity = %self.name,
            backend = backend.name(),
            properties = schema.len(),
            "schema discovered"
        );

        Ok(self.schema.get_or_init(|| Rc::new(schema)).clone())
    }

    /// Run every feature's install step, once per entity type.
    pub fn initialize_once(&self) {
        if self.initialized.get() {
            return;
        }
        // set first so a feature that constructs records cannot re-enter
        self.initialized.set(true);

        let mut hooks = self.hooks.borrow_mut();
        for feature in &self.features {
            feature.install(&mut hooks);
            debug!(entity = %self.name, feature = feature.name(), "feature installed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.hooks.borrow().listener_count(event)
    }

    pub fn dispatch_all(&self, id: Option<RecordId>, event: &mut HookEvent<'_>) -> Result<()> {
        let listeners = self.hooks.borrow().listeners(event.name());
        hooks::dispatch_all(&listeners, &HookScope { entity_type: self, id }, event)
    }

    pub fn dispatch_until_value(
        &self,
        id: Option<RecordId>,
        event: &mut HookEvent<'_>,
    ) -> Result<Option<Value>> {
        let listeners = self.hooks.borrow().listeners(event.name());
        hooks::dispatch_until_value(&listeners, &HookScope { entity_type: self, id }, event)
    }

    /// Set (or clear) the default backend of this entity type.
    pub fn set_default_backend(&self, backend: Option<BackendHandle>) {
        if let Some(backend) = &backend {
            debug!(entity = %self.name, backend = backend.name(), "type default backend configured");
        }
        *self.default_backend.borrow_mut() = backend;
    }

    pub fn default_backend(&self) -> Option<BackendHandle> {
        self.default_backend.borrow().clone()
    }

    /// Resolve the backend for an operation: `instance` first, then the type
    /// default, then the global default.
    pub fn backend(&self, instance: Option<&BackendHandle>) -> Result<BackendHandle> {
        resolve_backend(instance, self.default_backend(), &self.name)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("storage_name", &self.storage_name)
            .field("schema", &self.schema.get())
            .field("accessors", &self.accessors)
            .field("initialized", &self.initialized.get())
            .finish()
    }
}

/// Assembles an `EntityType`.
///
/// ```
/// use memorecord::{EntityType, PropertyAttributes};
///
/// let widget = EntityType::builder("Widget")
///     .property("name")
///     .property(("price", PropertyAttributes::new().nullable()))
///     .build();
///
/// assert_eq!(widget.storage_name(), "widget");
/// assert!(widget.resolved_schema().unwrap().contains("price"));
/// ```
pub struct EntityTypeBuilder {
    name: String,
    config: EntityConfig,
    properties: Vec<PropertyDecl>,
    custom: Vec<(String, Option<Getter>, Option<Setter>)>,
    associations: Vec<(String, Association)>,
    features: Vec<Box<dyn Feature>>,
    backend: Option<BackendHandle>,
}

impl EntityTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: EntityConfig::new(),
            properties: Vec::new(),
            custom: Vec::new(),
            associations: Vec::new(),
            features: vec![Box::new(BackendLookup)],
            backend: None,
        }
    }

    pub fn config(mut self, config: EntityConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage_name(mut self, storage_name: &str) -> Self {
        self.config = self.config.storage_name(storage_name);
        self
    }

    pub fn id_property(mut self, id_property: &str) -> Self {
        self.config = self.config.id_property(id_property);
        self
    }

    pub fn discover_fields(mut self, enabled: bool) -> Self {
        self.config = self.config.discover_fields(enabled);
        self
    }

    pub fn property(mut self, declaration: impl Into<PropertyDecl>) -> Self {
        self.properties.push(declaration.into());
        self
    }

    pub fn properties<I, D>(mut self, declarations: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<PropertyDecl>,
    {
        self.properties
            .extend(declarations.into_iter().map(Into::into));
        self
    }

    /// Route reads of `property` through `getter`.
    pub fn getter<F>(mut self, property: &str, getter: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + 'static,
    {
        let getter: Getter = Rc::new(getter);
        match self.custom.iter_mut().find(|(name, _, _)| name == property) {
            Some(entry) => entry.1 = Some(getter),
            None => self.custom.push((property.to_string(), Some(getter), None)),
        }
        self
    }

    /// Route writes of `property` through `setter`.
    pub fn setter<F>(mut self, property: &str, setter: F) -> Self
    where
        F: Fn(&Record, Value) -> Result<()> + 'static,
    {
        let setter: Setter = Rc::new(setter);
        match self.custom.iter_mut().find(|(name, _, _)| name == property) {
            Some(entry) => entry.2 = Some(setter),
            None => self.custom.push((property.to_string(), None, Some(setter))),
        }
        self
    }

    /// `property` holds the identity of a `target` record in `foreign_key`.
    pub fn belongs_to(self, property: &str, target: &Repository, foreign_key: &str) -> Self {
        self.association(property, AssociationKind::BelongsTo, target, foreign_key)
    }

    /// One `target` record points back at this one through `foreign_key`.
    pub fn has_one(self, property: &str, target: &Repository, foreign_key: &str) -> Self {
        self.association(property, AssociationKind::HasOne, target, foreign_key)
    }

    /// Many `target` records point back at this one through `foreign_key`.
    pub fn has_many(self, property: &str, target: &Repository, foreign_key: &str) -> Self {
        self.association(property, AssociationKind::HasMany, target, foreign_key)
    }

    fn association(
        mut self,
        property: &str,
        kind: AssociationKind,
        target: &Repository,
        foreign_key: &str,
    ) -> Self {
        self.associations.push((
            property.to_string(),
            Association::new(kind, target.clone(), foreign_key),
        ));
        self
    }

    pub fn feature(mut self, feature: impl Feature + 'static) -> Self {
        self.features.push(Box::new(feature));
        self
    }

    /// Register a single listener for `event`.
    pub fn listen<F>(mut self, event: &str, listener: F) -> Self
    where
        F: Fn(&HookScope<'_>, &mut HookEvent<'_>) -> Result<Option<Value>> + 'static,
    {
        let listener: Listener = Rc::new(listener);
        self.features.push(Box::new(ListenerFeature {
            event: event.to_string(),
            listener,
        }));
        self
    }

    pub fn backend(mut self, backend: BackendHandle) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Rc<EntityType> {
        let storage_name = self.config.resolve_storage_name(&self.name);

        let schema = OnceCell::new();
        if !self.properties.is_empty() {
            let _ = schema.set(Rc::new(PropertySchema::new(self.properties)));
        }

        let mut accessors = HashMap::new();
        if let Some(declared) = schema.get() {
            for name in declared.names() {
                accessors.insert(name.to_string(), Accessor::Field);
            }
        }
        for (name, getter, setter) in self.custom {
            accessors.insert(name, Accessor::Custom { getter, setter });
        }
        for (name, association) in self.associations {
            accessors.insert(name, Accessor::Association(association));
        }

        Rc::new(EntityType {
            name: self.name,
            storage_name,
            config: self.config,
            schema,
            accessors,
            features: self.features,
            hooks: RefCell::new(HookRegistry::new()),
            initialized: Cell::new(false),
            default_backend: RefCell::new(self.backend),
        })
    }
}
