use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::core::RecordId;
use crate::model::EntityType;
use crate::record::Record;

/// Instances of one entity type.
struct Bucket {
    entity_type: Rc<EntityType>,
    records: HashMap<RecordId, Record>,
}

/// Live instances keyed by entity type and identity.
///
/// Entity types are told apart by handle, not by name, so two types that
/// happen to share a name never see each other's records. Guarantees one
/// instance per identity for everyone sharing the map. Entries are never
/// evicted; `clear` and `remove` are the only ways out.
#[derive(Default)]
pub struct IdentityMap {
    entries: RefCell<HashMap<*const EntityType, Bucket>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_type: &Rc<EntityType>, id: RecordId) -> Option<Record> {
        self.entries
            .borrow()
            .get(&Rc::as_ptr(entity_type))
            .and_then(|bucket| bucket.records.get(&id))
            .cloned()
    }

    /// The registered instance for `(entity_type, id)`, or the one built by
    /// `create`, which is registered before it is returned.
    pub fn get_or_create<F>(&self, entity_type: &Rc<EntityType>, id: RecordId, create: F) -> Record
    where
        F: FnOnce() -> Record,
    {
        let entity = entity_type.name();
        if let Some(record) = self.get(entity_type, id) {
            trace!(entity, %id, "identity map hit");
            return record;
        }

        trace!(entity, %id, "identity map miss");
        let record = create();
        self.register(entity_type, id, record.clone());
        record
    }

    /// Store `record` under `(entity_type, id)`, replacing any previous entry.
    pub fn register(&self, entity_type: &Rc<EntityType>, id: RecordId, record: Record) {
        self.entries
            .borrow_mut()
            .entry(Rc::as_ptr(entity_type))
            .or_insert_with(|| Bucket {
                entity_type: entity_type.clone(),
                records: HashMap::new(),
            })
            .records
            .insert(id, record);
    }

    pub fn contains(&self, entity_type: &Rc<EntityType>, id: RecordId) -> bool {
        self.entries
            .borrow()
            .get(&Rc::as_ptr(entity_type))
            .is_some_and(|bucket| bucket.records.contains_key(&id))
    }

    pub fn remove(&self, entity_type: &Rc<EntityType>, id: RecordId) -> Option<Record> {
        let key = Rc::as_ptr(entity_type);
        let mut entries = self.entries.borrow_mut();
        let bucket = entries.get_mut(&key)?;
        let removed = bucket.records.remove(&id);
        if bucket.records.is_empty() {
            entries.remove(&key);
        }
        removed
    }

    /// Number of registered instances across every entity type.
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .map(|bucket| bucket.records.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Forget every instance of one entity type.
    pub fn clear_entity(&self, entity_type: &Rc<EntityType>) {
        self.entries.borrow_mut().remove(&Rc::as_ptr(entity_type));
    }
}

impl fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let mut map = f.debug_map();
        for bucket in entries.values() {
            let mut ids: Vec<_> = bucket.records.keys().copied().collect();
            ids.sort();
            map.entry(&bucket.entity_type.name(), &ids);
        }
        map.finish()
    }
}
