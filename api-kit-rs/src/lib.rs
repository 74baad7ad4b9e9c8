//! api-kit-rs/src/lib.rs
//! HTTP server toolkit: request admission, payload validation and
//! problem-details error responses on top of axum

pub mod admission;
pub mod headers;
pub mod logging;
pub mod problem;
pub mod safe_headers;
pub mod server;
pub mod users;
pub mod validated;

pub use admission::AdmissionChain;
pub use logging::init_logging;
pub use problem::{ErrorDetail, ErrorDetails, HttpError};
pub use safe_headers::{get_safe_header_value, get_safe_header_values};
pub use server::{shutdown_signal, ApiServer, ApiState, ServerError, ServerOptions};
pub use validated::ValidatedJson;
