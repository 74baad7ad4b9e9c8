//! # Input Validation Library
//!
//! Declarative payload validation for the API kit. Data-transfer types
//! describe their fields and rules through a [`TypeSchema`]; the
//! [`ValidationEngine`] evaluates those rules against a value and reports
//! failures keyed by the JSON paths a client used in its payload.
//!
//! ## Features
//!
//! - Type schemas with nested, optional, embedded and list fields
//! - Built-in rules (length, comparison, format) plus registered custom rules
//! - Internal-to-JSON field path mapping with a bounded per-type cache
//! - Stable human-readable messages for every rule
//! - Byte-level sanitization of individual values

pub mod cache;
pub mod engine;
mod errors;
pub mod field_map;
pub mod interpreter;
pub mod messages;
pub mod rules;
pub mod sanitizers;
pub mod schema;
pub mod validators;

pub use cache::{LimitedCache, DEFAULT_CACHE_CAPACITY};
pub use engine::{FieldErrorDetail, FieldErrors, ValidationEngine};
pub use errors::{SchemaError, ValidationError, ValidationResult};
pub use field_map::{FieldPathCache, FieldPathMap, FieldPathMapper};
pub use rules::Rule;
pub use sanitizers::get_safe_value;
pub use schema::{FieldSchema, FieldType, TypeSchema, Validatable};

/// Re-export commonly used items for convenience
pub mod prelude {
    pub use crate::engine::{FieldErrorDetail, FieldErrors, ValidationEngine};
    pub use crate::errors::{SchemaError, ValidationError, ValidationResult};
    pub use crate::field_map::FieldPathCache;
    pub use crate::rules::Rule;
    pub use crate::sanitizers;
    pub use crate::schema::{FieldSchema, FieldType, TypeSchema, Validatable};
    pub use crate::validators;
}

/// Version of the validation library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default maximum depth for nested objects
pub const DEFAULT_MAX_DEPTH: usize = 10;
