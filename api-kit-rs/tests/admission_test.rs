use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode, Version},
    response::Response,
    routing::{get, post, put},
    Router,
};
use input_validation_rs::{FieldSchema, Rule, TypeSchema, Validatable};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};

use api_kit::{ApiServer, ServerOptions, ValidatedJson};
use config_rs::ServiceConfig;

#[derive(Debug, Serialize, Deserialize)]
struct Note {
    text: String,
}

impl Validatable for Note {
    fn schema() -> &'static TypeSchema {
        static SCHEMA: Lazy<TypeSchema> = Lazy::new(|| {
            TypeSchema::builder("Note")
                .field(FieldSchema::string("Text").tag("text").rule(Rule::Required))
                .build()
        });
        &SCHEMA
    }
}

async fn echo_len(body: axum::body::Bytes) -> String {
    body.len().to_string()
}

async fn note_len(ValidatedJson(note): ValidatedJson<Note>) -> String {
    note.map(|n| n.text.len()).unwrap_or_default().to_string()
}

fn options() -> ServerOptions {
    ServerOptions::new().with_routes(|router| {
        router
            .route("/echo", put(echo_len).post(echo_len).delete(echo_len))
            .route("/items", get(|| async { "items" }))
            .route("/notes", post(note_len))
    })
}

fn app(max_body_size: usize) -> Router {
    let config = ServiceConfig {
        max_body_size,
        ..ServiceConfig::default()
    };
    ApiServer::new(config, options()).router()
}

fn cors_app() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    ApiServer::new(ServiceConfig::default(), options().with_cors(cors)).router()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_post_without_length_is_rejected() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::LENGTH_REQUIRED);
    assert_eq!(
        body_json(response).await,
        json!({"title": "Length Required", "status": 411})
    );
}

#[tokio::test]
async fn test_chunked_post_passes_length_gate() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(Body::from("{}"))
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "2");
}

#[tokio::test]
async fn test_wrong_content_type_is_rejected() {
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/echo")
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_LENGTH, "5")
        .body(Body::from("hello"))
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        &bytes[..],
        br#"{"title":"Unsupported Media Type","status":415}"#
    );
}

#[tokio::test]
async fn test_content_type_parameters_are_ignored() {
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/echo")
        .header(header::CONTENT_TYPE, "Application/JSON; charset=utf-8")
        .header(header::CONTENT_LENGTH, "2")
        .body(Body::from("{}"))
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_without_body_skips_content_type() {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/echo")
        .body(Body::empty())
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "0");
}

#[tokio::test]
async fn test_delete_with_body_requires_content_type() {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/echo")
        .header(header::CONTENT_LENGTH, "2")
        .body(Body::from("{}"))
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let payload = json!({"text": "x".repeat(64)}).to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/notes")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len().to_string())
        .body(Body::from(payload))
        .unwrap();

    let response = app(32).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body_json(response).await,
        json!({"title": "Payload Too Large", "status": 413})
    );
}

#[tokio::test]
async fn test_length_limit_ignores_declared_length() {
    // The limit counts bytes read, not what the header claims
    let payload = json!({"text": "x".repeat(64)}).to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/notes")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, "10")
        .body(Body::from(payload))
        .unwrap();

    let response = app(32).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_body_at_limit_is_accepted() {
    let payload = "x".repeat(32);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, "32")
        .body(Body::from(payload))
        .unwrap();

    let response = app(32).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "32");
}

#[tokio::test]
async fn test_http_1_0_is_rejected() {
    let request = Request::builder()
        .uri("/items")
        .version(Version::HTTP_10)
        .body(Body::empty())
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"title": "Bad Request", "status": 400})
    );
}

#[tokio::test]
async fn test_http_2_passes() {
    let request = Request::builder()
        .uri("/items")
        .version(Version::HTTP_2)
        .body(Body::empty())
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "items");
}

#[tokio::test]
async fn test_rejections_carry_security_headers() {
    let request = Request::builder()
        .uri("/items")
        .version(Version::HTTP_10)
        .body(Body::empty())
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["cache-control"], "no-store, no-cache, must-revalidate, proxy-revalidate");
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/echo")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .unwrap();

    let response = cors_app().oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_cors_headers_on_gate_rejection() {
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/echo")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_LENGTH, "5")
        .body(Body::from("hello"))
        .unwrap();

    let response = cors_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        body_json(response).await,
        json!({"title": "Unsupported Media Type", "status": 415})
    );
}

#[tokio::test]
async fn test_quoted_semicolon_in_content_type_parameter() {
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/echo")
        .header(header::CONTENT_TYPE, r#"application/json; profile="a;b""#)
        .header(header::CONTENT_LENGTH, "2")
        .body(Body::from("{}"))
        .unwrap();

    let response = app(1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "2");
}
