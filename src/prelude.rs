//! Everything an application typically needs, in one import.
//!
//! ```
//! use memorecord::prelude::*;
//!
//! let widget = EntityType::builder("Widget").property("name").build();
//! assert_eq!(widget.id_property(), "id");
//! ```

pub use crate::{
    Collection, EntityConfig, EntityType, Feature, IdentityMap, LifecycleState, MemoryBackend,
    PersistenceBackend, PropertyAttributes, PropertyFilter, Record, RecordError, RecordId,
    Related, Repository, Result, Seed, SortKey, Value, set_global_backend,
};
pub use crate::hooks::filter;
