//! api-kit-rs/src/logging.rs
//! Tracing subscriber setup
//!
//! Production deployments log JSON lines; everything else gets the
//! human-readable formatter. `RUST_LOG` overrides the default `info` filter.

use std::sync::atomic::{AtomicBool, Ordering};

use config_rs::ServiceConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Errors raised while installing the global subscriber
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to set global subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber; later calls are no-ops
pub fn init_logging(config: &ServiceConfig) -> Result<(), LoggingError> {
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = Registry::default().with(filter);

    let result = if config.is_production() {
        registry
            .with(fmt::layer().json().flatten_event(true).with_target(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    if let Err(e) = result {
        LOGGING_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(e.into());
    }

    tracing::info!(
        env = %config.env,
        json = config.is_production(),
        "Structured logging initialized"
    );
    Ok(())
}
