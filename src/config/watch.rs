//! Per-watcher reload loop.
//!
//! # Responsibilities
//! - Pull descriptor batches from one `Watcher`
//! - Merge and resolve them into the shared reader
//! - Refresh cached values and notify observers on change
//! - Back off after a failed `next()` and keep going until shutdown

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Config, Inner, Registered};
use crate::observability::metrics;
use crate::source::{Descriptor, SourceKind, Watcher};
use crate::value::Kind;

pub(super) async fn run(
    inner: Weak<Inner>,
    watcher: Arc<dyn Watcher>,
    source: String,
    kind: SourceKind,
    shutdown: CancellationToken,
    retry_interval: Duration,
) {
    tracing::debug!(source = %source, "Config watch loop started");

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = watcher.next() => next,
        };

        let descriptors = match next {
            Ok(descriptors) => descriptors,
            Err(e) if e.is_cancelled() => break,
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "Config watcher failed, retrying");
                metrics::record_watch_error(&source);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(retry_interval) => continue,
                }
            }
        };

        let Some(strong) = inner.upgrade() else {
            break;
        };
        Config { inner: strong }.apply(&source, kind, descriptors);
    }

    tracing::debug!(source = %source, "Config watch loop stopped");
}

impl Config {
    /// One watch cycle. A failed merge or resolve skips the refresh and notification.
    fn apply(&self, source: &str, kind: SourceKind, descriptors: Vec<Descriptor>) {
        if let Err(e) = self.inner.reader.merge(&descriptors) {
            tracing::warn!(source = %source, error = %e, "Failed to merge config update");
            metrics::record_reload("merge_failed");
            return;
        }
        if let Err(e) = self.inner.reader.resolve() {
            tracing::warn!(source = %source, error = %e, "Failed to resolve config update");
            metrics::record_reload("resolve_failed");
            return;
        }

        self.refresh_cache();

        let mut changed = false;
        for descriptor in descriptors {
            let unchanged = self
                .inner
                .descriptors
                .get(&descriptor.name)
                .is_some_and(|seen| seen.descriptor == descriptor);
            if unchanged {
                continue;
            }
            tracing::info!(source = %source, name = %descriptor.name, "Config changed");
            self.inner
                .descriptors
                .insert(descriptor.name.clone(), Registered { kind, descriptor });
            changed = true;
        }

        if changed {
            metrics::record_reload("applied");
            self.notify();
        } else {
            metrics::record_reload("unchanged");
        }
    }

    /// Store new content into cached values whose kind is unchanged; evict
    /// the rest so the next `get` builds a fresh value.
    fn refresh_cache(&self) {
        let mut evicted = Vec::new();

        for entry in self.inner.cache.iter() {
            let value = entry.value();
            let current = self.inner.reader.lookup(entry.key());

            match (value.load(), current) {
                (None, None) => {}
                (Some(old), Some(new)) if Kind::of(&old) == Kind::of(&new) => {
                    if *old != new {
                        value.store(new);
                    }
                }
                _ => evicted.push(entry.key().clone()),
            }
        }

        for path in &evicted {
            tracing::debug!(path = %path, "Evicted cached config value");
            self.inner.cache.remove(path);
        }
        metrics::record_cache_size(self.inner.cache.len());
    }

    fn notify(&self) {
        let observers = self.inner.observers.read().clone();
        tracing::debug!(observers = observers.len(), "Notifying config observers");
        metrics::record_notification(observers.len());
        for observer in observers {
            observer(self);
        }
    }
}
