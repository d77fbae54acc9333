//! File and directory source with hot reload.
//!
//! # Responsibilities
//! - Load a single config file, or every supported file in a directory
//! - Watch for changes and hand back the re-read descriptors
//!
//! # Design Decisions
//! - The parent directory is watched (non-recursive) so editors that save
//!   by rename are still observed
//! - Hidden files and unsupported extensions inside a directory are skipped;
//!   a single file with an unsupported extension is an error
//! - Supported extensions default to the built-in codecs; a source meant
//!   to feed a custom codec takes the registry's list via `with_formats`
//! - Descriptor name is the file name, format is the extension

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::encoding::SUPPORTED_FORMATS;
use crate::error::{ConfigError, Result};
use crate::source::{Descriptor, Source, SourceKind, Watcher};

/// Loads configuration from a file or a directory of files.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    formats: Formats,
}

/// Extensions a file source accepts.
type Formats = Arc<[String]>;

fn builtin_formats() -> Formats {
    SUPPORTED_FORMATS.iter().map(|f| f.to_string()).collect()
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            formats: builtin_formats(),
        }
    }

    /// Accept exactly these extensions, e.g. `Codecs::formats()` of a
    /// registry extended with custom codecs.
    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl Source for FileSource {
    async fn load(&self) -> Result<Vec<Descriptor>> {
        let path = self.path.clone();
        let formats = self.formats.clone();
        tokio::task::spawn_blocking(move || load_path(&path, &formats))
            .await
            .map_err(|e| ConfigError::Source {
                name: "file".to_string(),
                message: e.to_string(),
            })?
    }

    async fn watch(&self) -> Result<Option<Box<dyn Watcher>>> {
        Ok(Some(Box::new(FileWatcher::with_formats(&self.path, self.formats.clone())?)))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn name(&self) -> String {
        format!("file({})", self.path.display())
    }
}

fn load_path(path: &Path, formats: &[String]) -> Result<Vec<Descriptor>> {
    if std::fs::metadata(path)?.is_dir() {
        load_dir(path, formats)
    } else {
        Ok(vec![load_file(path, formats)?])
    }
}

fn load_dir(dir: &Path, formats: &[String]) -> Result<Vec<Descriptor>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if is_candidate(&path, formats) {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(|p| load_file(p, formats)).collect()
}

fn load_file(path: &Path, formats: &[String]) -> Result<Descriptor> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = format_of(path);

    if !formats.contains(&format) {
        return Err(ConfigError::UnsupportedFormat { name, format });
    }

    let data = std::fs::read(path)?;
    Ok(Descriptor::new(name, format, data))
}

fn format_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Visible file with a supported extension.
fn is_candidate(path: &Path, formats: &[String]) -> bool {
    let hidden = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(true);
    !hidden && formats.contains(&format_of(path))
}

/// Watches a file or directory and yields re-read descriptors on change.
pub struct FileWatcher {
    target: PathBuf,
    is_dir: bool,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<notify::Result<Event>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    formats: Formats,
    cancel: CancellationToken,
}

impl FileWatcher {
    /// Watch `path`, accepting the built-in formats.
    pub fn new(path: &Path) -> Result<Self> {
        Self::with_formats(path, builtin_formats())
    }

    fn with_formats(path: &Path, formats: Formats) -> Result<Self> {
        let target = std::fs::canonicalize(path)?;
        let is_dir = target.is_dir();
        let watch_root = if is_dir {
            target.clone()
        } else {
            target.parent().map(Path::to_path_buf).unwrap_or_else(|| target.clone())
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?target, "Config watcher started");

        Ok(Self {
            target,
            is_dir,
            rx: tokio::sync::Mutex::new(rx),
            watcher: Mutex::new(Some(watcher)),
            formats,
            cancel: CancellationToken::new(),
        })
    }

    /// Paths in `event` that this watcher cares about.
    fn affected(&self, event: &Event) -> BTreeSet<PathBuf> {
        if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
            return BTreeSet::new();
        }
        event
            .paths
            .iter()
            .filter(|p| {
                if self.is_dir {
                    p.parent() == Some(self.target.as_path()) && is_candidate(p, &self.formats)
                } else {
                    p.as_path() == self.target.as_path()
                }
            })
            .cloned()
            .collect()
    }

    fn reload(&self, paths: BTreeSet<PathBuf>) -> Result<Vec<Descriptor>> {
        if !self.is_dir {
            return Ok(vec![load_file(&self.target, &self.formats)?]);
        }
        // Removed files inside a directory keep their last merged content.
        paths
            .iter()
            .filter(|p| p.is_file())
            .map(|p| load_file(p, &self.formats))
            .collect()
    }
}

#[async_trait]
impl Watcher for FileWatcher {
    async fn next(&self) -> Result<Vec<Descriptor>> {
        let mut rx = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ConfigError::Cancelled),
            rx = self.rx.lock() => rx,
        };

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ConfigError::Cancelled),
                received = rx.recv() => match received {
                    Some(event) => event?,
                    None => return Err(ConfigError::Cancelled),
                },
            };

            let paths = self.affected(&event);
            if paths.is_empty() {
                continue;
            }

            tracing::debug!(path = ?self.target, kind = ?event.kind, "Config file change detected");
            let descriptors = self.reload(paths)?;
            if !descriptors.is_empty() {
                return Ok(descriptors);
            }
        }
    }

    fn stop(&self) -> Result<()> {
        self.cancel.cancel();
        // Dropping the notify watcher closes the event channel.
        self.watcher.lock().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TEST_JSON: &str = r#"{"test":{"server":{"addr":"127.0.0.1","port":8000}}}"#;

    #[tokio::test]
    async fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.json");
        std::fs::write(&file, TEST_JSON).unwrap();

        let ds = FileSource::new(&file).load().await.unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].name, "test.json");
        assert_eq!(ds[0].format, "json");
        assert_eq!(ds[0].data, TEST_JSON.as_bytes());
    }

    #[tokio::test]
    async fn test_load_dir_skips_hidden_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "a: 1\n").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join(".hidden.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let ds = FileSource::new(dir.path()).load().await.unwrap();
        let names: Vec<&str> = ds.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.json", "b.yaml"]);
    }

    #[tokio::test]
    async fn test_unsupported_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.ini");
        std::fs::write(&file, "a=1").unwrap();

        let err = FileSource::new(&file).load().await.unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_custom_formats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.ini"), "a=1").unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();

        let ds = FileSource::new(dir.path())
            .with_formats(["ini", "json"])
            .load()
            .await
            .unwrap();
        let names: Vec<&str> = ds.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["app.ini", "b.json"]);
        assert_eq!(ds[0].format, "ini");

        let ds = FileSource::new(dir.path().join("app.ini"))
            .with_formats(["ini"])
            .load()
            .await
            .unwrap();
        assert_eq!(ds[0].data, b"a=1");
    }

    #[tokio::test]
    async fn test_missing_path() {
        let err = FileSource::new("/definitely/not/here.json").load().await.unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[tokio::test]
    async fn test_watch_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.json");
        std::fs::write(&file, TEST_JSON).unwrap();

        let watcher = FileSource::new(&file).watch().await.unwrap().unwrap();
        let updated = r#"{"bar":{"event":"update"}}"#;
        std::fs::write(&file, updated).unwrap();

        // Editors may produce several events; wait for the final content.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let ds = tokio::time::timeout_at(deadline, watcher.next())
                .await
                .expect("no change observed")
                .unwrap();
            if ds[0].data == updated.as_bytes() {
                break;
            }
        }
        watcher.stop().unwrap();
    }

    #[tokio::test]
    async fn test_stop_cancels_next() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = FileSource::new(dir.path()).watch().await.unwrap().unwrap();
        watcher.stop().unwrap();
        let err = watcher.next().await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
