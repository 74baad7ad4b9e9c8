//! Safe value filter
//!
//! Accepts only printable ASCII (space included) below a fixed size, the
//! policy used for token-style header values.

/// Values of this many bytes or more are rejected
pub const MAX_SAFE_VALUE_BYTES: usize = 4096;

/// Return the value if it passes the byte-level policy
///
/// Empty input is always safe. Control bytes (0x00-0x1F), DEL (0x7F) and any
/// non-ASCII byte make the value unsafe, as does a length of
/// [`MAX_SAFE_VALUE_BYTES`] or more.
pub fn get_safe_value(s: &str) -> Option<&str> {
    if s.is_empty() {
        return Some(s);
    }

    if s.len() >= MAX_SAFE_VALUE_BYTES {
        return None;
    }

    if s.bytes().any(|b| b <= 0x1F || b >= 0x7F) {
        return None;
    }

    Some(s)
}

/// Returns true if [`get_safe_value`] accepts the value
pub fn is_safe_value(s: &str) -> bool {
    get_safe_value(s).is_some()
}
