use std::fmt;

use crate::collection::Collection;
use crate::core::{RecordError, Result, Value};
use crate::record::Record;
use crate::repository::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    BelongsTo,
    HasOne,
    HasMany,
}

/// A named relation from one entity type to records of another.
#[derive(Clone)]
pub struct Association {
    kind: AssociationKind,
    target: Repository,
    foreign_key: String,
}

/// Records reached through an association.
#[derive(Debug)]
pub enum Related {
    One(Option<Record>),
    Many(Collection),
}

impl Related {
    pub fn one(self) -> Option<Record> {
        match self {
            Self::One(record) => record,
            Self::Many(collection) => collection.first(),
        }
    }

    pub fn many(self) -> Collection {
        match self {
            Self::One(record) => Collection::from_records(record),
            Self::Many(collection) => collection,
        }
    }
}

impl Association {
    pub fn new(kind: AssociationKind, target: Repository, foreign_key: &str) -> Self {
        Self {
            kind,
            target,
            foreign_key: foreign_key.to_string(),
        }
    }

    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    pub fn target(&self) -> &Repository {
        &self.target
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn resolve(&self, owner: &Record) -> Result<Related> {
        match self.kind {
            AssociationKind::BelongsTo => {
                let key = owner.get(&self.foreign_key)?;
                if key.is_null() {
                    return Ok(Related::One(None));
                }
                let id = key.as_record_id().ok_or_else(|| {
                    RecordError::InvalidArgument(format!(
                        "{} is not a valid {} identity",
                        key,
                        self.target.entity_type().name()
                    ))
                })?;
                Ok(Related::One(self.target.find_by_id(id)?))
            }
            AssociationKind::HasOne => match owner.id() {
                Some(id) => Ok(Related::One(
                    self.target.find_one_by(&self.foreign_key, Value::from(id))?,
                )),
                None => Ok(Related::One(None)),
            },
            AssociationKind::HasMany => match owner.id() {
                Some(id) => Ok(Related::Many(
                    self.target.find_by(&self.foreign_key, Value::from(id))?,
                )),
                None => Ok(Related::Many(Collection::new())),
            },
        }
    }
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("kind", &self.kind)
            .field("target", &self.target.entity_type().name())
            .field("foreign_key", &self.foreign_key)
            .finish()
    }
}
