//! api-kit-rs/src/problem.rs
//! Problem-details error envelope and response helpers
//!
//! Every error leaving the server is rendered as
//! `{"title": ..., "status": ..., "details": {...}}` with the
//! `application/problem+json` media type.

use std::collections::BTreeMap;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use input_validation_rs::FieldErrors;
use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE_PROBLEM_JSON: &str = "application/problem+json";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Message used for a missing required field
pub const MUST_NOT_BE_UNDEFINED: &str = "must not be undefined";

/// One entry of the `details` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    /// Rule tag that produced the failure, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }
}

/// Field path (or other key) to detail
pub type ErrorDetails = BTreeMap<String, ErrorDetail>;

/// An HTTP error in problem-details form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{status} {title}")]
pub struct HttpError {
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

macro_rules! status_constructors {
    ($($(#[$meta:meta])* $name:ident => $status:ident;)+) => {
        $(
            $(#[$meta])*
            pub fn $name() -> Self {
                Self::new(StatusCode::$status)
            }
        )+
    };
}

impl HttpError {
    /// Error for `status` titled with its canonical reason phrase
    pub fn new(status: StatusCode) -> Self {
        Self {
            title: status
                .canonical_reason()
                .unwrap_or("Unknown Status")
                .to_string(),
            status: status.as_u16(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    status_constructors! {
        bad_request => BAD_REQUEST;
        unauthorized => UNAUTHORIZED;
        forbidden => FORBIDDEN;
        not_found => NOT_FOUND;
        method_not_allowed => METHOD_NOT_ALLOWED;
        not_acceptable => NOT_ACCEPTABLE;
        request_timeout => REQUEST_TIMEOUT;
        conflict => CONFLICT;
        gone => GONE;
        length_required => LENGTH_REQUIRED;
        precondition_failed => PRECONDITION_FAILED;
        /// 413, raised once a request body grows past the configured limit
        payload_too_large => PAYLOAD_TOO_LARGE;
        uri_too_long => URI_TOO_LONG;
        unsupported_media_type => UNSUPPORTED_MEDIA_TYPE;
        range_not_satisfiable => RANGE_NOT_SATISFIABLE;
        expectation_failed => EXPECTATION_FAILED;
        unprocessable_entity => UNPROCESSABLE_ENTITY;
        too_many_requests => TOO_MANY_REQUESTS;
        internal_server_error => INTERNAL_SERVER_ERROR;
        not_implemented => NOT_IMPLEMENTED;
        bad_gateway => BAD_GATEWAY;
        service_unavailable => SERVICE_UNAVAILABLE;
        gateway_timeout => GATEWAY_TIMEOUT;
        http_version_not_supported => HTTP_VERSION_NOT_SUPPORTED;
    }

    /// 400 carrying one detail per failed field, coded with the rule tag
    pub fn validation_failed(errors: &FieldErrors) -> Self {
        let details = errors
            .iter()
            .map(|(path, detail)| {
                (
                    path.clone(),
                    ErrorDetail {
                        message: detail.message.clone(),
                        code: Some(detail.validator.clone()),
                    },
                )
            })
            .collect();
        Self::bad_request().with_details(details)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match serde_json::to_vec(&self) {
            Ok(body) => {
                let mut response = (status, Body::from(body)).into_response();
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(CONTENT_TYPE_PROBLEM_JSON),
                );
                response
            }
            Err(e) => {
                tracing::error!(error = %e, status = self.status, "Failed to encode error response");
                status.into_response()
            }
        }
    }
}

/// Details with a single entry `key -> message`
pub fn create_error_detail(key: &str, message: &str) -> ErrorDetails {
    let mut details = ErrorDetails::new();
    details.insert(key.to_string(), ErrorDetail::new(message));
    details
}

/// Details reporting that `key` is missing
pub fn must_not_be_undefined(key: &str) -> ErrorDetails {
    create_error_detail(key, MUST_NOT_BE_UNDEFINED)
}

/// 200 with a plain-text body
pub fn send_text(text: impl Into<String>) -> Response {
    let mut response = (StatusCode::OK, text.into()).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_TEXT));
    response
}

/// 200 with `value` encoded as JSON, or a 500 envelope if encoding fails
pub fn send_json<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = (StatusCode::OK, Body::from(body)).into_response();
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response body");
            HttpError::internal_server_error().into_response()
        }
    }
}
