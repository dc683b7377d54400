pub mod error;
pub mod types;
pub mod value;

pub use error::{RecordError, Result};
pub use types::{PropertyAttributes, PropertyDecl, PropertyMap, PropertySchema, RecordId};
pub use value::Value;
