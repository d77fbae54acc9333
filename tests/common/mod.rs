//! Shared utilities for integration tests.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use layered_config::{Config, Descriptor};

/// Poll `check` every 10ms until it holds or `timeout` expires.
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Like `wait_until`, but for conditions that need an await.
#[allow(dead_code)]
pub async fn wait_until_async<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check().await
}

pub fn json(name: &str, body: &str) -> Descriptor {
    Descriptor::new(name, "json", body.as_bytes().to_vec())
}

#[allow(dead_code)]
pub fn write_file(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
}

/// Register an observer that only counts its invocations.
pub fn count_notifications(config: &Config) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    config
        .watch(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    calls
}
