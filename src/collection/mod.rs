//! Ordered, indexable record container.
//!
//! Collections returned by finders hold raw backend rows and turn each into a
//! registered record the first time it is read.

pub mod sort;

use std::cell::RefCell;
use std::fmt;

use crate::core::{PropertyMap, RecordId, Result, Value};
use crate::record::Record;
use crate::repository::Repository;

pub use sort::{NullOrdering, RecordComparator, SortKey};

enum Slot {
    Row {
        id: RecordId,
        row: PropertyMap,
    },
    Record(Record),
}

impl Slot {
    fn id(&self) -> Option<RecordId> {
        match self {
            Self::Row { id, .. } => Some(*id),
            Self::Record(record) => record.id(),
        }
    }
}

#[derive(Default)]
pub struct Collection {
    repository: Option<Repository>,
    slots: RefCell<Vec<Slot>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            repository: None,
            slots: RefCell::new(records.into_iter().map(Slot::Record).collect()),
        }
    }

    /// Rows materialized lazily through `repository`.
    pub fn from_rows(
        repository: Repository,
        rows: impl IntoIterator<Item = (RecordId, PropertyMap)>,
    ) -> Self {
        Self {
            repository: Some(repository),
            slots: RefCell::new(
                rows.into_iter()
                    .map(|(id, row)| Slot::Row { id, row })
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    pub fn push(&self, record: Record) {
        self.slots.borrow_mut().push(Slot::Record(record));
    }

    /// Number of slots still holding a raw row.
    pub fn pending(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|slot| matches!(slot, Slot::Row { .. }))
            .count()
    }

    /// Record at `index`, materializing it on first access.
    pub fn get(&self, index: usize) -> Option<Record> {
        let (id, row) = {
            let slots = self.slots.borrow();
            match slots.get(index)? {
                Slot::Record(record) => return Some(record.clone()),
                Slot::Row { id, row } => (*id, row.clone()),
            }
        };

        let record = self.repository.as_ref()?.hydrate(id, row);
        self.slots.borrow_mut()[index] = Slot::Record(record.clone());
        Some(record)
    }

    pub fn first(&self) -> Option<Record> {
        self.get(0)
    }

    pub fn last(&self) -> Option<Record> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    /// Every record, materializing all of them.
    pub fn records(&self) -> Vec<Record> {
        self.iter().collect()
    }

    /// Identities in order, without materializing anything.
    pub fn ids(&self) -> Vec<RecordId> {
        self.slots.borrow().iter().filter_map(Slot::id).collect()
    }

    pub fn contains_id(&self, id: RecordId) -> bool {
        self.slots.borrow().iter().any(|slot| slot.id() == Some(id))
    }

    pub fn get_by_id(&self, id: RecordId) -> Option<Record> {
        let index = self
            .slots
            .borrow()
            .iter()
            .position(|slot| slot.id() == Some(id))?;
        self.get(index)
    }

    /// Records whose `property` equals `value`.
    pub fn filter(&self, property: &str, value: impl Into<Value>) -> Result<Collection> {
        let value = value.into();
        let mut matched = Vec::new();
        for record in self.iter() {
            if record.get(property)? == value {
                matched.push(record);
            }
        }
        Ok(self.derived(matched))
    }

    /// Values of `property` for every record, in order.
    pub fn column(&self, property: &str) -> Result<Vec<Value>> {
        self.iter().map(|record| record.get(property)).collect()
    }

    /// A sorted copy; records with equal keys keep their relative order.
    pub fn sort_by(&self, keys: &[SortKey]) -> Result<Collection> {
        let mut entries = Vec::with_capacity(self.len());
        for record in self.iter() {
            let values = keys
                .iter()
                .map(|key| record.get(&key.property))
                .collect::<Result<Vec<_>>>()?;
            entries.push((values, record));
        }

        sort::sort_entries(&mut entries, keys)?;
        Ok(self.derived(entries.into_iter().map(|(_, record)| record).collect()))
    }

    /// JSON array of every record's `to_json` object.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let records = self
            .iter()
            .map(|record| record.to_json())
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::Value::Array(records))
    }

    fn derived(&self, records: Vec<Record>) -> Collection {
        Collection {
            repository: self.repository.clone(),
            slots: RefCell::new(records.into_iter().map(Slot::Record).collect()),
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("ids", &self.ids())
            .field("pending", &self.pending())
            .finish()
    }
}

impl FromIterator<Record> for Collection {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}
