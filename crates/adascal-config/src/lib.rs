//! # adascal config
//!
//! Run configuration (TOML) and the manufacturer classification table (JSON).

mod catalogue;
mod error;
mod loader;
mod schema;
mod validator;

pub use catalogue::{Catalogue, SkippedRow};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
