//! String validators
//!
//! This module provides validators for character classes and email addresses.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Based on the HTML5 "valid email address" definition but stricter
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .unwrap();
}

/// Non-empty and only ASCII letters
pub fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

/// Non-empty and only ASCII letters and digits
pub fn is_alphanumeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Non-empty and only Unicode letters and numbers
pub fn is_alphanumeric_unicode(s: &str) -> bool {
    !s.is_empty() && s.chars().all(char::is_alphanumeric)
}

/// Validate email address format
pub fn is_email(s: &str) -> bool {
    s.len() <= 254 && EMAIL_REGEX.is_match(s)
}
