//! Builder for `Config`.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, Options};
use crate::encoding::{Codec, Codecs};
use crate::source::Source;

/// Collects sources, codecs and options.
///
/// Sources are merged in registration order, so register the lowest
/// priority first: files, then environment, then flags.
#[derive(Default)]
pub struct ConfigBuilder {
    sources: Vec<Arc<dyn Source>>,
    codecs: Codecs,
    options: Options,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Register an extra codec, or replace a built-in one.
    ///
    /// File sources only pick up the new extension when built with
    /// `FileSource::with_formats`.
    pub fn with_codec(mut self, format: impl Into<String>, codec: impl Codec + 'static) -> Self {
        self.codecs.register(format, codec);
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Backoff after a failed `Watcher::next`.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.options.retry_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn build(self) -> Config {
        Config::from_parts(self.sources, self.codecs, self.options)
    }
}
