pub mod catalog;
pub mod engine;
pub mod memory;

pub use catalog::Catalog;
pub use engine::{
    BackendHandle, PersistenceBackend, SaveOutcome, SaveRequest, global_backend, resolve_backend,
    set_global_backend,
};
pub use memory::MemoryBackend;
