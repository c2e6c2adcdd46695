//! Logging setup and span helpers.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the binary (or a test) via [`init_logging`].

use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logs.
    Json,
    /// Human-readable logs.
    #[default]
    Pretty,
}

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG` controls levels (default `info`). Safe to call more than once;
/// later calls are no-ops.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty().with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}

/// Span for one remote round trip issued by the script engine.
#[must_use]
pub fn script_span(operation: &str, seq: u64) -> Span {
    tracing::debug_span!("script", op = operation, seq = seq)
}

/// Span for draft store operations on one query.
#[must_use]
pub fn draft_span(operation: &str, query_id: &str) -> Span {
    tracing::debug_span!("draft", op = operation, query_id = query_id)
}
