//! api-kit-rs/src/admission.rs
//! Request admission gates
//!
//! Each gate either passes the request on unchanged or answers with a
//! problem-details error. [`AdmissionChain`] installs them in order:
//!
//! 1. HTTP/1.1 or newer (400 otherwise)
//! 2. Body length limit, enforced while the body is read (413)
//! 3. Length or chunked transfer-encoding on HTTP/1.1 writes (411)
//! 4. Content type of write requests (415)
//!
//! A CORS layer, when configured, sits between gates 2 and 3.

use std::error::Error as StdError;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING},
        HeaderMap, Method, Version,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    BoxError, Router,
};
use config_rs::ServiceConfig;
use futures_util::StreamExt;
use thiserror::Error;
use tower_http::cors::CorsLayer;

use crate::problem::HttpError;

/// Raised by a limited body stream once more than `limit` bytes were read
#[derive(Debug, Error)]
#[error("request body exceeds the limit of {limit} bytes")]
pub struct BodyLengthExceeded {
    pub limit: usize,
}

/// Whether `err` or any error in its source chain is a [`BodyLengthExceeded`]
pub fn is_body_length_exceeded(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<BodyLengthExceeded>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Wrap `body` so that reading past `limit` bytes fails
pub fn limit_body(body: Body, limit: usize) -> Body {
    let mut read = 0usize;
    let stream = body.into_data_stream().map(move |chunk| {
        let chunk = chunk.map_err(BoxError::from)?;
        read = read.saturating_add(chunk.len());
        if read > limit {
            return Err(BoxError::from(BodyLengthExceeded { limit }));
        }
        Ok(chunk)
    });
    Body::from_stream(stream)
}

fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
}

/// POST, PUT and PATCH always; DELETE only when it declares a body
pub fn is_write_request(method: &Method, headers: &HeaderMap) -> bool {
    if carries_body(method) {
        return true;
    }
    *method == Method::DELETE
        && (content_length(headers).is_some_and(|len| len > 0) || is_chunked(headers))
}

/// Lower-cased `type/subtype` of a Content-Type value, parameters dropped
///
/// Returns `None` if the value is not a well-formed media type.
pub fn parse_media_type(value: &str) -> Option<String> {
    let (essence, params) = value.split_once(';').unwrap_or((value, ""));
    let essence = essence.trim();
    let (kind, subtype) = essence.split_once('/')?;
    if !is_token(kind) || !is_token(subtype) {
        return None;
    }

    for param in split_parameters(params)? {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        let (key, value) = param.split_once('=')?;
        if !is_token(key.trim()) || value.trim().is_empty() {
            return None;
        }
    }

    Some(essence.to_ascii_lowercase())
}

/// Split media type parameters on `;` outside quoted strings
///
/// Returns `None` if a quoted string is never closed.
fn split_parameters(params: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, b) in params.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if quoted => escaped = true,
            b'"' => quoted = !quoted,
            b';' if !quoted => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if quoted {
        return None;
    }
    parts.push(&params[start..]);
    Some(parts)
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Rejects requests older than HTTP/1.1
pub async fn require_http_1_1_or_higher(request: Request, next: Next) -> Response {
    if request.version() < Version::HTTP_11 {
        tracing::debug!(version = ?request.version(), "Rejected request with outdated protocol version");
        return HttpError::bad_request().into_response();
    }
    next.run(request).await
}

/// Body byte limit handed to [`require_max_body_length`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxBodyLength(pub usize);

/// Caps the number of body bytes a handler can read
///
/// The request is always admitted; the limit fails the body read instead,
/// which handlers report as 413.
pub async fn require_max_body_length(
    State(MaxBodyLength(limit)): State<MaxBodyLength>,
    request: Request,
    next: Next,
) -> Response {
    let request = request.map(|body| limit_body(body, limit));
    next.run(request).await
}

/// Rejects HTTP/1.1 POST, PUT and PATCH requests that declare neither a
/// Content-Length nor a chunked Transfer-Encoding
pub async fn require_content_length_or_transfer_encoding(request: Request, next: Next) -> Response {
    let headers = request.headers();
    if carries_body(request.method())
        && request.version() == Version::HTTP_11
        && !headers.contains_key(CONTENT_LENGTH)
        && !is_chunked(headers)
    {
        tracing::debug!(method = %request.method(), uri = %request.uri(), "Rejected write request without length");
        return HttpError::length_required().into_response();
    }
    next.run(request).await
}

/// Normalized media type accepted by [`require_content_type`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedContentType(Arc<str>);

impl AllowedContentType {
    pub fn new(media_type: &str) -> Self {
        let normalized = parse_media_type(media_type).unwrap_or_else(|| {
            media_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        });
        Self(normalized.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rejects write requests whose Content-Type is missing, malformed or not
/// the allowed media type
pub async fn require_content_type(
    State(allowed): State<AllowedContentType>,
    request: Request,
    next: Next,
) -> Response {
    if !is_write_request(request.method(), request.headers()) {
        return next.run(request).await;
    }

    let media_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_media_type);

    match media_type {
        Some(media_type) if media_type == allowed.as_str() => next.run(request).await,
        other => {
            tracing::debug!(
                received = ?other,
                allowed = allowed.as_str(),
                "Rejected request with unsupported content type"
            );
            HttpError::unsupported_media_type().into_response()
        }
    }
}

/// The ordered set of admission gates
#[derive(Debug, Clone)]
pub struct AdmissionChain {
    max_body_length: MaxBodyLength,
    allowed_content_type: AllowedContentType,
}

impl AdmissionChain {
    pub fn new(max_body_size: usize, allowed_content_type: &str) -> Self {
        Self {
            max_body_length: MaxBodyLength(max_body_size),
            allowed_content_type: AllowedContentType::new(allowed_content_type),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.max_body_size, &config.allowed_content_type)
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_length.0
    }

    pub fn allowed_content_type(&self) -> &str {
        self.allowed_content_type.as_str()
    }

    /// Install the gates around `router`, with `cors` between the body
    /// limit and the length gate
    pub fn apply<S>(&self, router: Router<S>, cors: Option<CorsLayer>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let router = router
            .layer(middleware::from_fn_with_state(
                self.allowed_content_type.clone(),
                require_content_type,
            ))
            .layer(middleware::from_fn(require_content_length_or_transfer_encoding));

        let router = match cors {
            Some(cors) => router.layer(cors),
            None => router,
        };

        router
            .layer(middleware::from_fn_with_state(
                self.max_body_length,
                require_max_body_length,
            ))
            .layer(middleware::from_fn(require_http_1_1_or_higher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::HeaderValue};
    use test_case::test_case;

    #[test_case("application/json", Some("application/json"))]
    #[test_case("Application/JSON; charset=utf-8", Some("application/json"))]
    #[test_case("  application/json ;charset=UTF-8", Some("application/json"))]
    #[test_case("application/json;", Some("application/json") ; "trailing semicolon")]
    #[test_case("application/json; charset", None ; "parameter without value")]
    #[test_case("application", None ; "missing subtype")]
    #[test_case("application/", None ; "empty subtype")]
    #[test_case("", None ; "empty")]
    #[test_case("text plain/json", None ; "space in type")]
    #[test_case(r#"application/json; profile="a;b""#, Some("application/json") ; "quoted semicolon")]
    #[test_case(r#"application/json; title="say \"hi\"; ok"; charset=utf-8"#, Some("application/json") ; "escaped quote")]
    #[test_case(r#"application/json; profile="a;b"#, None ; "unterminated quote")]
    #[test_case(r#"application/json; profile="a\""#, None ; "escaped closing quote")]
    fn test_parse_media_type(value: &str, expected: Option<&str>) {
        assert_eq!(parse_media_type(value).as_deref(), expected);
    }

    #[test]
    fn test_allowed_content_type_is_normalized() {
        assert_eq!(
            AllowedContentType::new("Application/Json; charset=utf-8").as_str(),
            "application/json"
        );
    }

    #[test]
    fn test_chain_from_config() {
        let config = ServiceConfig {
            max_body_size: 2048,
            allowed_content_type: "Application/Merge-Patch+JSON".to_string(),
            ..ServiceConfig::default()
        };
        let chain = AdmissionChain::from_config(&config);
        assert_eq!(chain.max_body_size(), 2048);
        assert_eq!(chain.allowed_content_type(), "application/merge-patch+json");
    }

    #[test]
    fn test_is_write_request() {
        let empty = HeaderMap::new();
        assert!(is_write_request(&Method::POST, &empty));
        assert!(is_write_request(&Method::PUT, &empty));
        assert!(is_write_request(&Method::PATCH, &empty));
        assert!(!is_write_request(&Method::GET, &empty));
        assert!(!is_write_request(&Method::DELETE, &empty));

        let mut with_length = HeaderMap::new();
        with_length.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert!(is_write_request(&Method::DELETE, &with_length));

        let mut zero_length = HeaderMap::new();
        zero_length.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        assert!(!is_write_request(&Method::DELETE, &zero_length));

        let mut chunked = HeaderMap::new();
        chunked.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip, Chunked"));
        assert!(is_write_request(&Method::DELETE, &chunked));
    }

    #[tokio::test]
    async fn test_limit_body_within_limit() {
        let body = limit_body(Body::from("0123456789"), 10);
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(bytes.len(), 10);
    }

    #[tokio::test]
    async fn test_limit_body_exceeded() {
        let body = limit_body(Body::from("0123456789a"), 10);
        let err = to_bytes(body, usize::MAX).await.unwrap_err();
        assert!(is_body_length_exceeded(&err));
    }

    #[test]
    fn test_other_errors_are_not_length_errors() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(!is_body_length_exceeded(&err));
    }
}
