//! Error handling for the validation library
//!
//! Two families of errors exist here. `SchemaError` describes a problem with a
//! type's declared rules and is expected at startup, when schemas are checked.
//! `ValidationError` describes a failure to run validation at all; rule
//! violations are not errors, they are reported as `FieldErrors`.

use thiserror::Error;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Failure to run validation against a value
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The value could not be turned into its JSON view
    #[error("Failed to serialize value for validation: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The JSON view of a value is not an object
    #[error("Value of type {type_name} does not serialize to a JSON object")]
    NotAnObject { type_name: String },
}

/// Problems in a declared schema or rule tag
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Tag string names a rule that does not exist and cannot be a custom rule
    #[error("Unknown validation rule '{0}'")]
    UnknownRule(String),

    /// Rule needs a parameter (e.g. `min=2`) but none was given
    #[error("Rule '{rule}' requires a parameter")]
    MissingParam { rule: String },

    /// Rule parameter could not be parsed
    #[error("Invalid parameter '{param}' for rule '{rule}'")]
    InvalidParam { rule: String, param: String },

    /// Cross-field rule points at a field the type does not have
    #[error("Rule '{rule}' on {field} references unknown field '{target}'")]
    UnknownFieldReference {
        rule: String,
        field: String,
        target: String,
    },

    /// Custom rule used by a field but never registered with the engine
    #[error("Custom rule '{rule}' used on {field} is not registered")]
    UnregisteredRule { rule: String, field: String },

    /// Embedded fields are flattened into their parent and have no value
    /// of their own to check
    #[error("Embedded field {field} cannot carry rules")]
    RulesOnEmbeddedField { field: String },
}
