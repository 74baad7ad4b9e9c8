//! URL validators

use url::Url;

/// Absolute URL with a scheme
pub fn is_url(s: &str) -> bool {
    Url::parse(s).is_ok()
}

/// Absolute URI, or an absolute path as used in request targets
pub fn is_uri(s: &str) -> bool {
    if s.starts_with('/') {
        return !s.chars().any(|c| c.is_whitespace() || c.is_control());
    }
    is_url(s)
}
