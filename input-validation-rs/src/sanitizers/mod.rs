//! Input sanitization utilities
//!
//! Byte-level filters applied to individual values before they are trusted,
//! such as header values read by middleware.

pub mod safe_value;

pub use safe_value::*;
