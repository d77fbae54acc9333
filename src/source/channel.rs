//! Push-fed source for remote or in-process producers.
//!
//! A producer (a poller of a remote store, a test, an admin endpoint)
//! holds the `ChannelPublisher` and pushes fresh descriptors; the
//! orchestrator's watch loop receives them through `ChannelWatcher`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, Result};
use crate::source::{Descriptor, Source, SourceKind, Watcher};

/// Source whose content is pushed by a `ChannelPublisher`.
pub struct ChannelSource {
    name: String,
    kind: SourceKind,
    snapshot: Arc<Mutex<Vec<Descriptor>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<Descriptor>>>>,
}

/// Sending half of a `ChannelSource`.
#[derive(Clone)]
pub struct ChannelPublisher {
    name: String,
    snapshot: Arc<Mutex<Vec<Descriptor>>>,
    tx: mpsc::UnboundedSender<Vec<Descriptor>>,
}

impl ChannelSource {
    pub fn new(name: impl Into<String>, initial: Vec<Descriptor>) -> (Self, ChannelPublisher) {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = Arc::new(Mutex::new(initial));

        let source = Self {
            name: name.clone(),
            kind: SourceKind::Remote,
            snapshot: snapshot.clone(),
            rx: Mutex::new(Some(rx)),
        };
        let publisher = ChannelPublisher { name, snapshot, tx };
        (source, publisher)
    }

    /// Override the precedence layer (defaults to `SourceKind::Remote`).
    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }
}

impl ChannelPublisher {
    /// Replace the snapshot and wake the watcher.
    pub fn publish(&self, descriptors: Vec<Descriptor>) -> Result<()> {
        {
            let mut snapshot = self.snapshot.lock();
            for d in &descriptors {
                match snapshot.iter_mut().find(|s| s.name == d.name) {
                    Some(existing) => *existing = d.clone(),
                    None => snapshot.push(d.clone()),
                }
            }
        }

        self.tx.send(descriptors).map_err(|_| ConfigError::Source {
            name: self.name.clone(),
            message: "watcher is closed".to_string(),
        })
    }
}

#[async_trait]
impl Source for ChannelSource {
    async fn load(&self) -> Result<Vec<Descriptor>> {
        Ok(self.snapshot.lock().clone())
    }

    async fn watch(&self) -> Result<Option<Box<dyn Watcher>>> {
        match self.rx.lock().take() {
            Some(rx) => Ok(Some(Box::new(ChannelWatcher {
                rx: tokio::sync::Mutex::new(rx),
                cancel: CancellationToken::new(),
            }))),
            None => {
                tracing::warn!(source = %self.name, "Channel source already has a watcher");
                Ok(None)
            }
        }
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

struct ChannelWatcher {
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<Descriptor>>>,
    cancel: CancellationToken,
}

#[async_trait]
impl Watcher for ChannelWatcher {
    async fn next(&self) -> Result<Vec<Descriptor>> {
        let mut rx = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ConfigError::Cancelled),
            rx = self.rx.lock() => rx,
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ConfigError::Cancelled),
            received = rx.recv() => received.ok_or(ConfigError::Cancelled),
        }
    }

    fn stop(&self) -> Result<()> {
        self.cancel.cancel();
        Ok(())
    }
}
