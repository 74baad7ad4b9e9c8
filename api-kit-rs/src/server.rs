//! api-kit-rs/src/server.rs
//! Server assembly
//!
//! Layers, outermost first: panic recovery, access log, security headers,
//! no-cache headers, error envelopes for framework responses, request
//! timeout (skipped when zero), the admission gates (with CORS between the body limit and the
//! length gate), then the application routes.

use std::any::Any;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{FromRef, Request},
    http::{
        header::{ALLOW, CONTENT_TYPE},
        StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use config_rs::ServiceConfig;
use input_validation_rs::{FieldPathCache, ValidationEngine, DEFAULT_CACHE_CAPACITY};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::admission::AdmissionChain;
use crate::headers::{respond_with_no_cache_headers, respond_with_security_headers};
use crate::problem::{send_text, HttpError};

/// Shared state handed to every route
#[derive(Debug, Clone)]
pub struct ApiState {
    pub engine: Arc<ValidationEngine>,
    pub config: Arc<ServiceConfig>,
}

impl FromRef<ApiState> for Arc<ValidationEngine> {
    fn from_ref(state: &ApiState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<ApiState> for Arc<ServiceConfig> {
    fn from_ref(state: &ApiState) -> Self {
        state.config.clone()
    }
}

/// Registers application routes on the router
pub type RouteCallback = Arc<dyn Fn(Router<ApiState>) -> Router<ApiState> + Send + Sync>;

/// Called with the bound address once the listener is ready
pub type ListenCallback = Arc<dyn Fn(SocketAddr) + Send + Sync>;

/// Options for [`ApiServer`]
#[derive(Clone, Default)]
pub struct ServerOptions {
    pub routes: Option<RouteCallback>,
    pub cors: Option<CorsLayer>,
    /// Overrides the configured port
    pub port: Option<u16>,
    pub on_listen: Option<ListenCallback>,
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes<F>(mut self, routes: F) -> Self
    where
        F: Fn(Router<ApiState>) -> Router<ApiState> + Send + Sync + 'static,
    {
        self.routes = Some(Arc::new(routes));
        self
    }

    pub fn with_cors(mut self, cors: CorsLayer) -> Self {
        self.cors = Some(cors);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn on_listen<F>(mut self, callback: F) -> Self
    where
        F: Fn(SocketAddr) + Send + Sync + 'static,
    {
        self.on_listen = Some(Arc::new(callback));
        self
    }
}

/// Errors raised while running the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// The HTTP server
pub struct ApiServer {
    config: Arc<ServiceConfig>,
    engine: Arc<ValidationEngine>,
    options: ServerOptions,
}

impl ApiServer {
    /// Server with a validation engine backed by a fresh field path cache
    pub fn new(config: ServiceConfig, options: ServerOptions) -> Self {
        let cache = Arc::new(FieldPathCache::new(DEFAULT_CACHE_CAPACITY));
        Self {
            config: Arc::new(config),
            engine: Arc::new(ValidationEngine::new(cache)),
            options,
        }
    }

    /// Replace the validation engine, e.g. one with custom rules registered
    pub fn with_engine(mut self, engine: ValidationEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    /// Build the full middleware stack around the application routes
    pub fn router(&self) -> Router {
        let state = ApiState {
            engine: self.engine.clone(),
            config: self.config.clone(),
        };

        let routes = Router::new().route("/health", get(liveness));
        let routes = match &self.options.routes {
            Some(register) => register(routes),
            None => routes,
        };
        let routes = routes.fallback(not_found);

        let admitted =
            AdmissionChain::from_config(&self.config).apply(routes, self.options.cors.clone());

        // A zero deadline means no deadline
        let request_timeout = self.config.read_timeout() + self.config.write_timeout();
        let admitted = if request_timeout.is_zero() {
            admitted
        } else {
            admitted.layer(TimeoutLayer::new(request_timeout))
        };

        admitted
            .layer(middleware::from_fn(envelope_framework_errors))
            .layer(middleware::from_fn(respond_with_no_cache_headers))
            .layer(middleware::from_fn(respond_with_security_headers))
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(handle_panic))
            .with_state(state)
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.bind_address(self.options.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!(
            addr = %local_addr,
            max_body_size = self.config.max_body_size,
            allowed_content_type = %self.config.allowed_content_type,
            read_timeout_secs = self.config.read_timeout_secs,
            write_timeout_secs = self.config.write_timeout_secs,
            "API server listening"
        );
        if let Some(on_listen) = &self.options.on_listen {
            on_listen(local_addr);
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

/// Liveness check
async fn liveness() -> Response {
    send_text("Ok")
}

async fn not_found() -> HttpError {
    HttpError::not_found()
}

// The router answers unknown methods with a bare 405 and the timeout layer
// with a bare 408; both get the error envelope here.
async fn envelope_framework_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    let bare = !response.headers().contains_key(CONTENT_TYPE);
    if !bare || (status != StatusCode::METHOD_NOT_ALLOWED && status != StatusCode::REQUEST_TIMEOUT) {
        return response;
    }

    let allow = response.headers().get(ALLOW).cloned();
    let mut enveloped = HttpError::new(status).into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(ALLOW, allow);
    }
    enveloped
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %message, "Request handler panicked");
    HttpError::internal_server_error().into_response()
}

/// Resolves on Ctrl+C, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
