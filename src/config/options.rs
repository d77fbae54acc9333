//! Engine options.
//!
//! All fields have defaults so an empty TOML/JSON document is a valid
//! options file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for a `Config` instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    /// Pause after a failed `Watcher::next` before retrying, in milliseconds.
    pub retry_interval_ms: u64,

    /// Log every descriptor picked up by `Config::load`.
    pub log_descriptors: bool,
}

impl Options {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            retry_interval_ms: 1000,
            log_descriptors: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.retry_interval(), Duration::from_secs(1));
        assert!(options.log_descriptors);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options: Options = toml::from_str("retry_interval_ms = 250").unwrap();
        assert_eq!(options.retry_interval(), Duration::from_millis(250));
        assert!(options.log_descriptors);

        let options: Options = toml::from_str("").unwrap();
        assert_eq!(options, Options::default());
    }
}
