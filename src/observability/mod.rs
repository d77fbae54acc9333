//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! reader / config / sources produce:
//!     → tracing events (structured fields: source, name, format, path)
//!     → metrics.rs (reload outcomes, watch errors, notifications, cache size)
//!
//! Consumers:
//!     → logging.rs installs a subscriber for binaries
//!     → any `metrics` recorder installed by the embedding application
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder itself
//! - Metric updates are cheap no-ops when no recorder is installed

pub mod logging;
pub mod metrics;
