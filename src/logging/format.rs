//! Subscriber setup and the per-request span every scoring log line is nested in.

use crate::config::LogConfig;
use crate::error::{Result, ScoringError};
use axum::body::Body;
use axum::http::Request;
use std::sync::Arc;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Value of the `service` field on request spans.
pub const SERVICE_NAME: &str = "fraud-scoring";

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber: one JSON object per line (or plain text)
    /// on stdout. `RUST_LOG` overrides `config.level`.
    pub fn init(config: &LogConfig) -> Result<()> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&config.level)
                .map_err(|e| ScoringError::Config(format!("log.level `{}`: {}", config.level, e)))?,
        };
        let registry = tracing_subscriber::registry().with(filter);
        let installed = if config.json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(true)
                        .with_span_list(false)
                        .with_writer(std::io::stdout),
                )
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(false).with_writer(std::io::stdout))
                .try_init()
        };
        installed.map_err(|e| ScoringError::Config(format!("logger already installed: {}", e)))
    }

    /// Span builder for the HTTP trace layer. Tags each request with the
    /// service and the model version that answers it.
    pub fn request_span(model_version: Arc<str>) -> impl Fn(&Request<Body>) -> Span + Clone {
        move |req: &Request<Body>| {
            tracing::info_span!(
                "request",
                service = SERVICE_NAME,
                model_version = %model_version,
                method = %req.method(),
                path = %req.uri().path(),
            )
        }
    }
}
