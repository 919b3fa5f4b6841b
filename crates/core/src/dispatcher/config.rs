//! Configuration for the dispatcher.

use serde::{Deserialize, Serialize};

/// Run-level orchestration knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Reindex the configured projects before processing.
    #[serde(default)]
    pub index: bool,

    /// Process scans on a bounded worker pool instead of one at a time.
    #[serde(default)]
    pub scan_parallel: bool,

    /// Concurrent scan workers when `scan_parallel` is set. Clamped to
    /// 1..=60 at dispatch time.
    #[serde(default = "default_scan_workers")]
    pub scan_workers: usize,
}

fn default_scan_workers() -> usize {
    8
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            index: false,
            scan_parallel: false,
            scan_workers: default_scan_workers(),
        }
    }
}
