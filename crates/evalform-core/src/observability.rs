//! Observability helpers for evalform.
//!
//! Structured logging through `tracing`, with one span constructor so every
//! load, refresh and submit carries the same subject/form fields.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::id::FormKey;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs.
    Json,
    /// Pretty-printed logs.
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Safe to call multiple times; subsequent calls are no-ops. `RUST_LOG`
/// controls levels (e.g. `info`, `evalform_core=debug`) and defaults to
/// `info`.
///
/// ```rust
/// use evalform_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .try_init()
                    .ok();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .try_init()
                    .ok();
            }
        }
    });
}

/// Creates a span for an evaluation operation on one form.
///
/// ```rust
/// use evalform_core::{FormKey, observability::evaluation_span};
///
/// let key = FormKey::new("farmer-7", "form-1");
/// let span = evaluation_span("submit", &key);
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn evaluation_span(operation: &str, key: &FormKey) -> Span {
    tracing::info_span!(
        "evaluation",
        op = operation,
        subject_id = %key.subject_id,
        form_id = %key.form_id,
    )
}
