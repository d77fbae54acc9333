//! Layered configuration engine.
//!
//! Aggregates configuration from files, environment variables, command-line
//! flags and pushed remote snapshots into one resolved tree, with
//! `${key:default}` placeholders, hot-swappable typed values and change
//! observers.

pub mod config;
pub mod encoding;
pub mod error;
pub mod observability;
pub mod reader;
pub mod source;
pub mod value;

pub use config::{Config, ConfigBuilder, Observer, Options, SourceState};
pub use encoding::{Codec, Codecs};
pub use error::{ConfigError, Result};
pub use reader::Reader;
pub use source::{Descriptor, Source, SourceKind, Watcher};
pub use value::{Kind, Value};
