use std::fmt;
use std::rc::Rc;

use crate::association::Association;
use crate::core::{Result, Value};
use crate::record::Record;

pub type Getter = Rc<dyn Fn(&Record) -> Result<Value>>;
pub type Setter = Rc<dyn Fn(&Record, Value) -> Result<()>>;

/// How a property name is resolved, decided once when the entity type is
/// built.
#[derive(Clone)]
pub enum Accessor {
    /// Plain value kept in the record's data map
    Field,
    /// User code; a missing half falls back to the data map
    Custom {
        getter: Option<Getter>,
        setter: Option<Setter>,
    },
    /// Related records, resolved through `Record::related`
    Association(Association),
}

impl Accessor {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Custom { .. } => "custom",
            Self::Association(_) => "association",
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field => write!(f, "Field"),
            Self::Custom { getter, setter } => f
                .debug_struct("Custom")
                .field("getter", &getter.is_some())
                .field("setter", &setter.is_some())
                .finish(),
            Self::Association(association) => f.debug_tuple("Association").field(association).finish(),
        }
    }
}
