//! Validator functions
//!
//! Predicates backing the built-in format rules. Each takes the string form of
//! a value and returns whether it is acceptable; they can also be used
//! directly.

pub mod identifier;
pub mod network;
pub mod string;
pub mod url;

// Re-export all validators for convenience
pub use identifier::*;
pub use network::*;
pub use string::*;
pub use url::*;
