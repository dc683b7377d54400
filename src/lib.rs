// ============================================================================
// memorecord Library
// ============================================================================

//! Active Record layer over pluggable storage backends.
//!
//! Records are lazily loaded by identity, track which properties changed, and
//! are shared through an identity map so every lookup of one identity yields
//! the same instance.
//!
//! ```
//! use std::sync::Arc;
//! use memorecord::{EntityType, MemoryBackend, Repository, Value};
//!
//! # fn main() -> memorecord::Result<()> {
//! let widgets = Repository::new(
//!     EntityType::builder("Widget")
//!         .properties(["name", "price"])
//!         .backend(Arc::new(MemoryBackend::new()))
//!         .build(),
//! );
//!
//! let widget = widgets.create([("name", "foo")])?;
//! widget.save()?;
//!
//! let id = widget.id().unwrap();
//! assert!(widgets.factory(id)?.ptr_eq(&widget));
//! assert_eq!(widget.get("price")?, Value::Null);
//! # Ok(())
//! # }
//! ```

pub mod association;
pub mod collection;
pub mod config;
pub mod core;
pub mod hooks;
pub mod model;
pub mod prelude;
pub mod record;
pub mod registry;
pub mod repository;
pub mod storage;

// Re-export main types for convenience
pub use association::{Association, AssociationKind, Related};
pub use collection::{Collection, NullOrdering, SortKey};
pub use config::EntityConfig;
pub use core::{
    PropertyAttributes, PropertyDecl, PropertyMap, PropertySchema, RecordError, RecordId, Result,
    Value,
};
pub use hooks::{BEFORE_SET, BackendLookup, FIND_BY_ID, Feature, HookEvent, HookScope, PropertyFilter};
pub use model::{EntityType, EntityTypeBuilder};
pub use record::{LifecycleState, Record};
pub use registry::IdentityMap;
pub use repository::{Repository, Seed};
pub use storage::{
    BackendHandle, MemoryBackend, PersistenceBackend, SaveOutcome, SaveRequest, set_global_backend,
};
