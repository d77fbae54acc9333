//! Configuration orchestrator.
//!
//! # Data Flow
//! ```text
//! Config::load()
//!     → Source::load() per source (registration order)
//!     → Reader::merge() per descriptor
//!     → descriptor registry (name → last merged descriptor)
//!     → Source::watch() → one watch task per watcher
//!     → Reader::resolve() once at the end
//!
//! Config::get(path)
//!     → path cache hit, or Reader::value() cached on first use
//!
//! On change (watch.rs):
//!     Watcher::next() → merge → resolve
//!     → refresh cached Values in place
//!     → compare descriptors with the registry
//!     → notify observers once if anything changed
//! ```
//!
//! # Design Decisions
//! - Errors during `load` are returned; errors in a watch task are logged
//!   and the last good state is kept
//! - Only queried paths are cached
//! - Observers receive the `Config` itself and re-query what they need

pub mod builder;
pub mod options;
mod watch;

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value as Node;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::encoding::Codecs;
use crate::error::{ConfigError, Result};
use crate::observability::metrics;
use crate::reader::tree::{merge_into, Tree};
use crate::reader::{resolver, Reader};
use crate::source::{Descriptor, Source, SourceKind, Watcher};
use crate::value::Value;

pub use builder::ConfigBuilder;
pub use options::Options;

/// Callback invoked after a watch cycle changed at least one descriptor.
pub type Observer = Arc<dyn Fn(&Config) + Send + Sync>;

/// Lifecycle of one registered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Unloaded,
    Loaded,
    Watching,
    Closed,
}

#[derive(Debug, Clone)]
struct Registered {
    kind: SourceKind,
    descriptor: Descriptor,
}

struct Inner {
    sources: Vec<Arc<dyn Source>>,
    states: Mutex<Vec<SourceState>>,
    options: Options,
    reader: Reader,
    cache: DashMap<String, Value>,
    descriptors: DashMap<String, Registered>,
    observers: RwLock<Vec<Observer>>,
    watchers: Mutex<Vec<Arc<dyn Watcher>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        for watcher in self.watchers.get_mut().drain(..) {
            let _ = watcher.stop();
        }
    }
}

/// Aggregated configuration from every registered source.
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Config {
    inner: Arc<Inner>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    fn from_parts(sources: Vec<Arc<dyn Source>>, codecs: Codecs, options: Options) -> Self {
        let states = vec![SourceState::Unloaded; sources.len()];
        Self {
            inner: Arc::new(Inner {
                sources,
                states: Mutex::new(states),
                options,
                reader: Reader::new(codecs),
                cache: DashMap::new(),
                descriptors: DashMap::new(),
                observers: RwLock::new(Vec::new()),
                watchers: Mutex::new(Vec::new()),
                tasks: Mutex::new(Vec::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Load every source, start watchers, then resolve placeholders.
    ///
    /// Fails on the first error; sources merged before it stay merged.
    pub async fn load(&self) -> Result<()> {
        if self.inner.shutdown.is_cancelled() {
            return Err(ConfigError::Cancelled);
        }

        for (index, source) in self.inner.sources.iter().enumerate() {
            let descriptors = source.load().await?;

            // Only merged descriptors are registered.
            for d in descriptors {
                self.inner.reader.merge(std::slice::from_ref(&d))?;
                if self.inner.options.log_descriptors {
                    tracing::info!(source = %source.name(), name = %d.name, format = %d.format, "Loaded config");
                }
                self.inner.descriptors.insert(
                    d.name.clone(),
                    Registered {
                        kind: source.kind(),
                        descriptor: d,
                    },
                );
            }

            if self.state(index) == SourceState::Watching {
                continue;
            }
            self.set_state(index, SourceState::Loaded);

            if let Some(watcher) = source.watch().await? {
                let watcher: Arc<dyn Watcher> = Arc::from(watcher);
                self.inner.watchers.lock().push(watcher.clone());

                let task = tokio::spawn(watch::run(
                    Arc::downgrade(&self.inner),
                    watcher,
                    source.name(),
                    source.kind(),
                    self.inner.shutdown.clone(),
                    self.inner.options.retry_interval(),
                ));
                self.inner.tasks.lock().push(task);
                self.set_state(index, SourceState::Watching);
            }
        }

        self.inner.reader.resolve()?;
        Ok(())
    }

    /// Decode the whole configuration into `T`.
    ///
    /// Precedence is fixed regardless of registration order: file and
    /// remote values, overridden by environment values, overridden by flags.
    /// The overlays are resolved against the already resolved base, so no
    /// value is expanded twice.
    pub fn scan<T: DeserializeOwned>(&self) -> Result<T> {
        let base = self.inner.reader.snapshot();
        let mut overlay = self.layer(SourceKind::Env)?;
        merge_into(&mut overlay, self.layer(SourceKind::Flag)?);
        let overlay = resolver::resolve_against(&overlay, &base);

        let mut tree = base;
        merge_into(&mut tree, overlay);
        serde_json::from_value(Node::Object(tree)).map_err(ConfigError::Scan)
    }

    /// Registered descriptors of one kind, decoded and merged by name order.
    fn layer(&self, kind: SourceKind) -> Result<Tree> {
        let mut descriptors: Vec<Descriptor> = self
            .inner
            .descriptors
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));

        let mut tree = Tree::new();
        for d in &descriptors {
            merge_into(&mut tree, self.inner.reader.decode(d)?);
        }
        Ok(tree)
    }

    /// Register an observer. Observers run in registration order.
    pub fn watch(&self, observer: impl Fn(&Config) + Send + Sync + 'static) -> Result<()> {
        self.inner.observers.write().push(Arc::new(observer));
        Ok(())
    }

    /// Cached value for `path`; a miss queries the reader and caches the
    /// result, including the not-found sentinel.
    pub fn get(&self, path: &str) -> Value {
        if let Some(value) = self.inner.cache.get(path) {
            return value.value().clone();
        }

        // Looked up under the shard lock so a concurrent cache refresh
        // cannot miss the new entry.
        let value = self
            .inner
            .cache
            .entry(path.to_string())
            .or_insert_with(|| {
                self.inner
                    .reader
                    .value(path)
                    .unwrap_or_else(|| Value::not_found(path))
            })
            .value()
            .clone();
        metrics::record_cache_size(self.inner.cache.len());
        value
    }

    /// Serialized resolved tree (compact JSON).
    pub fn source(&self) -> Result<Vec<u8>> {
        self.inner.reader.source()
    }

    /// Stop every watcher and drop cached state.
    ///
    /// All watchers get a stop attempt; the first failure is returned.
    pub fn close(&self) -> Result<()> {
        self.inner.shutdown.cancel();

        let watchers = std::mem::take(&mut *self.inner.watchers.lock());
        let mut first_error = None;
        for watcher in watchers {
            if let Err(e) = watcher.stop() {
                tracing::warn!(error = %e, "Failed to stop config watcher");
                first_error.get_or_insert(e);
            }
        }

        for state in self.inner.states.lock().iter_mut() {
            *state = SourceState::Closed;
        }
        self.inner.cache.clear();
        self.inner.descriptors.clear();
        metrics::record_cache_size(0);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// `close`, then wait for every watch task to finish.
    pub async fn shutdown(&self) -> Result<()> {
        let result = self.close();
        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        result
    }

    /// Per-source lifecycle state, in registration order.
    pub fn states(&self) -> Vec<(String, SourceState)> {
        let states = self.inner.states.lock();
        self.inner
            .sources
            .iter()
            .zip(states.iter())
            .map(|(source, state)| (source.name(), *state))
            .collect()
    }

    fn state(&self, index: usize) -> SourceState {
        self.inner.states.lock()[index]
    }

    fn set_state(&self, index: usize, state: SourceState) {
        self.inner.states.lock()[index] = state;
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("states", &self.states())
            .field("cached", &self.inner.cache.len())
            .finish()
    }
}
