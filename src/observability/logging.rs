//! Structured logging.
//!
//! # Responsibilities
//! - Install the `tracing` subscriber for the command-line tool
//! - Honour `RUST_LOG`, falling back to a caller-provided directive

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a `fmt` subscriber filtered by `RUST_LOG` or `default_directive`.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
