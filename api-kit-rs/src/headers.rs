//! api-kit-rs/src/headers.rs
//! Response header middlewares

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Headers hardening browsers against embedding, sniffing and downgrade
pub const SECURITY_HEADERS: [(&str, &str); 11] = [
    ("cross-origin-embedder-policy", "require-corp"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-site"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "same-origin"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains; preload",
    ),
    ("x-content-type-options", "nosniff"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "DENY"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "1; mode=block"),
];

/// Headers keeping proxies and clients from caching responses
pub const NO_CACHE_HEADERS: [(&str, &str); 5] = [
    (
        "cache-control",
        "no-store, no-cache, must-revalidate, proxy-revalidate",
    ),
    ("expires", "0"),
    ("pragma", "no-cache"),
    ("surrogate-control", "no-store"),
    ("x-accel-expires", "0"),
];

// Handlers may set their own values; those are kept.
fn set_defaults(headers: &mut HeaderMap, defaults: &[(&'static str, &'static str)]) {
    for &(name, value) in defaults {
        headers
            .entry(HeaderName::from_static(name))
            .or_insert_with(|| HeaderValue::from_static(value));
    }
}

pub async fn respond_with_security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    set_defaults(response.headers_mut(), &SECURITY_HEADERS);
    response
}

pub async fn respond_with_no_cache_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    set_defaults(response.headers_mut(), &NO_CACHE_HEADERS);
    response
}
