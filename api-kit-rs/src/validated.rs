//! api-kit-rs/src/validated.rs
//! Decode-and-validate extractor for JSON payloads
//!
//! `ValidatedJson<T>` reads the body of write requests, decodes it into `T`
//! (rejecting fields `T` does not declare) and runs the [`ValidationEngine`]
//! on the result. Handlers only ever see payloads that passed every rule.

use std::sync::Arc;

use axum::{
    async_trait,
    body::to_bytes,
    extract::{FromRef, FromRequest, Request},
};
use input_validation_rs::{Validatable, ValidationEngine};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::admission::{is_body_length_exceeded, is_write_request};
use crate::problem::HttpError;

/// A validated payload, or `None` for requests without a body
///
/// GET, HEAD and OPTIONS never carry one; DELETE only does when it declares
/// a non-zero Content-Length or a chunked Transfer-Encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedJson<T>(pub Option<T>);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: Validatable + DeserializeOwned + Send,
    S: Send + Sync,
    Arc<ValidationEngine>: FromRef<S>,
{
    type Rejection = HttpError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_write_request(request.method(), request.headers()) {
            return Ok(Self(None));
        }

        let engine = Arc::<ValidationEngine>::from_ref(state);
        let bytes = to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|e| {
                if is_body_length_exceeded(&e) {
                    tracing::debug!("Request body exceeded the configured limit");
                    HttpError::payload_too_large()
                } else {
                    tracing::debug!(error = %e, "Failed to read request body");
                    HttpError::bad_request()
                }
            })?;

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "Request body is not valid JSON");
            HttpError::bad_request()
        })?;

        decode_and_validate(&engine, value).map(|payload| Self(Some(payload)))
    }
}

/// Decode `value` into `T` and run its rules
///
/// Fails with 400 on unknown fields, a shape `T` cannot decode, or rule
/// violations (carried as details), and with 500 if the decoded value cannot
/// be inspected.
pub fn decode_and_validate<T>(engine: &ValidationEngine, value: Value) -> Result<T, HttpError>
where
    T: Validatable + DeserializeOwned,
{
    if let Some(field) = T::schema().find_unknown_field(&value) {
        tracing::debug!(field = %field, schema = T::schema().name(), "Request body has unknown field");
        return Err(HttpError::bad_request());
    }

    let payload: T = serde_json::from_value(value).map_err(|e| {
        tracing::debug!(error = %e, schema = T::schema().name(), "Failed to decode request body");
        HttpError::bad_request()
    })?;

    let errors = engine.validate(&payload).map_err(|e| {
        tracing::error!(error = %e, schema = T::schema().name(), "Failed to inspect decoded payload");
        HttpError::internal_server_error()
    })?;

    if errors.is_empty() {
        Ok(payload)
    } else {
        tracing::debug!(fields = errors.len(), schema = T::schema().name(), "Request body failed validation");
        Err(HttpError::validation_failed(&errors))
    }
}
