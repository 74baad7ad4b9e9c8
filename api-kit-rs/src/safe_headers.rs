//! api-kit-rs/src/safe_headers.rs
//! Sanitized access to request header values

use axum::http::HeaderMap;
use input_validation_rs::get_safe_value;

/// The first non-empty value of header `name`
///
/// Returns `Some("")` when the name is empty or the header is absent, and
/// `None` if any of its values contains a control or non-ASCII byte.
pub fn get_safe_header_value(name: &str, headers: &HeaderMap) -> Option<String> {
    let values = get_safe_header_values(name, headers)?;
    Some(values.into_iter().next().unwrap_or_default())
}

/// Every non-empty value of header `name`, in order
///
/// Returns `None` if any value is unsafe.
pub fn get_safe_header_values(name: &str, headers: &HeaderMap) -> Option<Vec<String>> {
    if name.is_empty() {
        return Some(Vec::new());
    }

    let mut values = Vec::new();
    for value in headers.get_all(name) {
        let text = get_safe_value(value.to_str().ok()?)?;
        if !text.is_empty() {
            values.push(text.to_string());
        }
    }
    Some(values)
}
