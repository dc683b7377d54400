//! Per-entity-type entry point: construction, identity-aware lookup and
//! finders.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::association::Related;
use crate::collection::Collection;
use crate::core::{PropertyMap, RecordError, RecordId, Result, Value};
use crate::hooks::HookEvent;
use crate::model::EntityType;
use crate::record::Record;
use crate::registry::IdentityMap;
use crate::storage::BackendHandle;

/// What `Repository::factory` builds a record from.
#[derive(Debug, Clone, Default)]
pub enum Seed {
    /// A new, empty record
    #[default]
    Empty,
    /// The registered instance for this identity
    Id(RecordId),
    /// Property values; an identity among them selects the registered instance
    Values(PropertyMap),
}

impl From<RecordId> for Seed {
    fn from(id: RecordId) -> Self {
        Self::Id(id)
    }
}

impl From<i64> for Seed {
    fn from(id: i64) -> Self {
        Self::Id(RecordId(id))
    }
}

impl From<PropertyMap> for Seed {
    fn from(values: PropertyMap) -> Self {
        Self::Values(values)
    }
}

/// Records of one entity type, sharing an identity map.
#[derive(Clone)]
pub struct Repository {
    entity_type: Rc<EntityType>,
    identity_map: Rc<IdentityMap>,
}

impl Repository {
    /// A repository with an identity map of its own.
    pub fn new(entity_type: Rc<EntityType>) -> Self {
        Self::with_identity_map(entity_type, Rc::new(IdentityMap::new()))
    }

    /// A repository registering its records in `identity_map`, which other
    /// repositories may share.
    pub fn with_identity_map(entity_type: Rc<EntityType>, identity_map: Rc<IdentityMap>) -> Self {
        Self {
            entity_type,
            identity_map,
        }
    }

    pub fn entity_type(&self) -> &Rc<EntityType> {
        &self.entity_type
    }

    pub fn identity_map(&self) -> &Rc<IdentityMap> {
        &self.identity_map
    }

    /// Forget every registered instance of this entity type. Handles already
    /// given out stay valid but are no longer shared with later lookups.
    pub fn clear_identity_map(&self) {
        debug!(entity = %self.entity_type.name(), "identity map cleared");
        self.identity_map.clear_entity(&self.entity_type);
    }

    /// The backend used for type-level operations such as finders.
    pub fn backend(&self) -> Result<BackendHandle> {
        self.entity_type.backend(None)
    }

    pub fn set_default_backend(&self, backend: Option<BackendHandle>) {
        self.entity_type.set_default_backend(backend);
    }

    /// A new record with `values` assigned through `Record::set`.
    pub fn create<I, K, V>(&self, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let record = Record::blank(self.entity_type.clone(), Rc::downgrade(&self.identity_map));
        for (property, value) in values {
            record.set(property.as_ref(), value)?;
        }
        Ok(record)
    }

    /// Build a record from a JSON object. Arrays and objects nested inside
    /// it are rejected; an identity among the keys behaves as in `factory`.
    pub fn create_from_json(&self, json: &serde_json::Value) -> Result<Record> {
        let serde_json::Value::Object(object) = json else {
            return Err(RecordError::InvalidArgument(format!(
                "{} expects a JSON object, got {}",
                self.entity_type.name(),
                json
            )));
        };

        let mut values = PropertyMap::new();
        for (property, value) in object {
            values.insert(property.clone(), Value::from_json(value)?);
        }
        self.factory(values)
    }

    /// Construct or look up a record.
    ///
    /// Identity-based seeds never touch the backend themselves; a missing
    /// row surfaces on first property access.
    pub fn factory(&self, seed: impl Into<Seed>) -> Result<Record> {
        match seed.into() {
            Seed::Empty => self.create(PropertyMap::new()),
            Seed::Id(id) => Ok(self.get(id)),
            Seed::Values(mut values) => {
                let identity = values
                    .remove(self.entity_type.id_property())
                    .filter(|value| !value.is_null());
                let Some(identity) = identity else {
                    return self.create(values);
                };

                let id = identity.as_record_id().ok_or_else(|| {
                    RecordError::InvalidArgument(format!(
                        "{} is not a valid {} identity",
                        identity,
                        self.entity_type.name()
                    ))
                })?;
                let record = self.get(id);
                for (property, value) in values {
                    record.set(&property, value)?;
                }
                Ok(record)
            }
        }
    }

    /// The single instance registered for `id`, created unloaded on first
    /// request.
    pub fn get(&self, id: RecordId) -> Record {
        self.identity_map
            .get_or_create(&self.entity_type, id, || {
                Record::identified(
                    self.entity_type.clone(),
                    Rc::downgrade(&self.identity_map),
                    id,
                )
            })
    }

    /// Ask the `core.find_by_id` listeners for `id`; the first answer wins.
    pub fn find_by_id(&self, id: RecordId) -> Result<Option<Record>> {
        self.entity_type.initialize_once();

        let answer = self
            .entity_type
            .dispatch_until_value(Some(id), &mut HookEvent::FindById { id })?;
        trace!(entity = %self.entity_type.name(), %id, found = answer.is_some(), "find by id");

        match answer {
            None => Ok(None),
            Some(found) => {
                let found_id = found.as_record_id().ok_or_else(|| {
                    RecordError::InvalidArgument(format!(
                        "Lookup for {} answered {} instead of an identity",
                        self.entity_type.name(),
                        found
                    ))
                })?;
                Ok(Some(self.get(found_id)))
            }
        }
    }

    /// Records whose `property` equals `value`. Rows are materialized into
    /// records only when the collection is read.
    pub fn find_by(&self, property: &str, value: impl Into<Value>) -> Result<Collection> {
        let value = value.into();

        if property == self.entity_type.id_property() {
            let found = match value.as_record_id() {
                Some(id) => self.find_by_id(id)?,
                None => None,
            };
            return Ok(Collection::from_records(found));
        }

        if !self.entity_type.schema(None)?.contains(property) {
            return Err(RecordError::undefined_property(
                self.entity_type.name(),
                property,
            ));
        }

        let backend = self.backend()?;
        let rows = backend.find_by(self.entity_type.storage_name(), property, &value)?;
        debug!(
            entity = %self.entity_type.name(),
            property,
            backend = backend.name(),
            rows = rows.len(),
            "find by property"
        );
        Ok(Collection::from_rows(self.clone(), rows))
    }

    pub fn find_one_by(&self, property: &str, value: impl Into<Value>) -> Result<Option<Record>> {
        Ok(self.find_by(property, value)?.first())
    }

    /// Dynamic finders: `findByName(value)` and `findOneByName(value)`.
    ///
    /// The part after the prefix names the property in camel case and is
    /// matched against the snake case property name.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use memorecord::{EntityType, MemoryBackend, Repository};
    ///
    /// let posts = Repository::new(
    ///     EntityType::builder("Post")
    ///         .properties(["title", "author_id"])
    ///         .backend(Arc::new(MemoryBackend::new()))
    ///         .build(),
    /// );
    /// posts.create([("author_id", 3)])?.save()?;
    ///
    /// let found = posts.find("findByAuthorId", 3)?.many();
    /// assert_eq!(found.len(), 1);
    /// # Ok::<(), memorecord::RecordError>(())
    /// ```
    pub fn find(&self, method: &str, value: impl Into<Value>) -> Result<Related> {
        if let Some(name) = method.strip_prefix("findOneBy").filter(|name| !name.is_empty()) {
            return Ok(Related::One(self.find_one_by(&snake_case(name), value)?));
        }
        if let Some(name) = method.strip_prefix("findBy").filter(|name| !name.is_empty()) {
            return Ok(Related::Many(self.find_by(&snake_case(name), value)?));
        }
        Err(RecordError::InvalidArgument(format!(
            "There is no finder {} on {}",
            method,
            self.entity_type.name()
        )))
    }

    /// Materialize a raw backend row. An instance that is already loaded
    /// keeps its in-memory state.
    pub fn hydrate(&self, id: RecordId, row: PropertyMap) -> Record {
        let record = self.get(id);
        if !record.is_loaded() {
            record.apply_loaded(&self.entity_type, row);
        }
        record
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &self.entity_type.name())
            .field("registered", &self.identity_map.len())
            .finish()
    }
}

fn snake_case(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, ch) in camel.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryBackend;

    fn widgets() -> (Repository, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let entity_type = EntityType::builder("Widget")
            .properties(["name", "price"])
            .backend(backend.clone())
            .build();
        (Repository::new(entity_type), backend)
    }

    fn row(name: &str, price: i64) -> PropertyMap {
        [
            ("name".to_string(), Value::from(name)),
            ("price".to_string(), Value::from(price)),
        ]
        .into()
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(snake_case("Name"), "name");
        assert_eq!(snake_case("AuthorId"), "author_id");
        assert_eq!(snake_case("price"), "price");
    }

    #[test]
    fn factory_by_id_returns_the_registered_instance() {
        let (repo, _) = widgets();

        let first = repo.factory(5_i64).unwrap();
        let second = repo.factory(RecordId(5)).unwrap();

        assert!(first.ptr_eq(&second));
        assert!(!first.is_loaded());
    }

    #[test]
    fn factory_values_with_identity_update_the_registered_instance() {
        let (repo, backend) = widgets();
        let id = backend.insert_row("widget", row("foo", 1)).unwrap();

        let mut seed = PropertyMap::new();
        seed.insert("id".into(), Value::from(id));
        seed.insert("price".into(), Value::from(9));
        let record = repo.factory(seed).unwrap();

        assert!(record.ptr_eq(&repo.get(id)));
        assert_eq!(record.get("name").unwrap(), Value::from("foo"));
        assert_eq!(record.dirty_properties(), vec!["price".to_string()]);
    }

    #[test]
    fn create_from_json_rejects_non_objects() {
        let (repo, _) = widgets();

        assert!(matches!(
            repo.create_from_json(&serde_json::json!([1, 2])),
            Err(RecordError::InvalidArgument(_))
        ));

        let record = repo
            .create_from_json(&serde_json::json!({"name": "foo", "price": 3}))
            .unwrap();
        assert_eq!(record.get("price").unwrap(), Value::from(3));
        assert!(record.id().is_none());
    }

    #[test]
    fn find_by_id_consults_the_backend() {
        let (repo, backend) = widgets();
        let id = backend.insert_row("widget", row("foo", 1)).unwrap();

        let found = repo.find_by_id(id).unwrap().unwrap();
        assert!(found.ptr_eq(&repo.get(id)));
        assert!(repo.find_by_id(RecordId(99)).unwrap().is_none());
    }

    #[test]
    fn find_by_undeclared_property_is_rejected() {
        let (repo, _) = widgets();
        assert!(matches!(
            repo.find_by("colour", "red"),
            Err(RecordError::UndefinedProperty { .. })
        ));
    }

    #[test]
    fn unknown_finder_names_are_rejected() {
        let (repo, _) = widgets();
        assert!(matches!(
            repo.find("fetchByName", "foo"),
            Err(RecordError::InvalidArgument(_))
        ));
        assert!(matches!(
            repo.find("findBy", "foo"),
            Err(RecordError::InvalidArgument(_))
        ));
    }

    #[test]
    fn hydrate_keeps_loaded_state() {
        let (repo, _) = widgets();
        let record = repo.create([("name", "foo")]).unwrap();
        record.save().unwrap();
        let id = record.id().unwrap();
        record.set("name", "edited").unwrap();

        let hydrated = repo.hydrate(id, row("stale", 0));

        assert!(hydrated.ptr_eq(&record));
        assert_eq!(hydrated.get("name").unwrap(), Value::from("edited"));
    }

    #[test]
    fn clear_identity_map_breaks_sharing() {
        let (repo, _) = widgets();
        let before = repo.get(RecordId(1));

        repo.clear_identity_map();

        assert!(!before.ptr_eq(&repo.get(RecordId(1))));
    }
}
