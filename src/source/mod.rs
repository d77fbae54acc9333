//! Configuration sources.
//!
//! # Data Flow
//! ```text
//! environment / files / argv / remote producer
//!     → Source::load()   (current snapshot as Descriptors)
//!     → Source::watch()  (optional Watcher)
//!         → Watcher::next() blocks until new Descriptors or stop()
//! ```
//!
//! # Design Decisions
//! - Sources only turn raw input into named, formatted byte blobs;
//!   decoding belongs to the `encoding` registry
//! - Static sources (env snapshot, flags) return no watcher
//! - Stopping a watcher makes a blocked `next()` return `ConfigError::Cancelled`

pub mod channel;
pub mod env;
pub mod file;
pub mod flag;

use async_trait::async_trait;

use crate::error::Result;

pub use channel::{ChannelPublisher, ChannelSource};
pub use env::EnvSource;
pub use file::{FileSource, FileWatcher};
pub use flag::FlagSource;

/// An immutable named, formatted byte blob produced by a source.
///
/// An empty `format` marks a single scalar whose dotted path is `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub format: String,
    pub data: Vec<u8>,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, format: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            data: data.into(),
        }
    }

    /// A single scalar addressed by a dotted path.
    pub fn scalar(path: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(path, "", value)
    }

    pub fn is_scalar(&self) -> bool {
        self.format.is_empty()
    }
}

/// Where a source's values sit in `Config::scan` precedence.
///
/// `File` and `Remote` form the base layer, `Env` overrides them and
/// `Flag` overrides everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    File,
    Remote,
    Env,
    Flag,
}

/// A provider of descriptors.
#[async_trait]
pub trait Source: Send + Sync {
    /// Produce the current full snapshot of this source.
    async fn load(&self) -> Result<Vec<Descriptor>>;

    /// Return a watcher if this source supports change notification.
    async fn watch(&self) -> Result<Option<Box<dyn Watcher>>>;

    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    /// Human-readable name for logs.
    fn name(&self) -> String;
}

/// A live subscription to a source's changes.
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Block until new descriptors are available.
    ///
    /// Returns `ConfigError::Cancelled` once `stop` has been called.
    async fn next(&self) -> Result<Vec<Descriptor>>;

    /// Release resources and wake a blocked `next`.
    fn stop(&self) -> Result<()>;
}
