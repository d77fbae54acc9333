//! Metrics for the reload pipeline.
//!
//! # Metrics
//! - `config_reloads_total` (counter): watch cycles by `outcome`
//!   (`applied`, `unchanged`, `merge_failed`, `resolve_failed`)
//! - `config_watch_errors_total` (counter): `next()` failures by `source`
//! - `config_observer_notifications_total` (counter): observer fan-outs
//! - `config_cache_entries` (gauge): cached path count

use ::metrics::{counter, gauge};

pub fn record_reload(outcome: &'static str) {
    counter!("config_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_watch_error(source: &str) {
    counter!("config_watch_errors_total", "source" => source.to_string()).increment(1);
}

pub fn record_notification(observers: usize) {
    counter!("config_observer_notifications_total").increment(observers as u64);
}

pub fn record_cache_size(entries: usize) {
    gauge!("config_cache_entries").set(entries as f64);
}
