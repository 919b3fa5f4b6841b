//! Configuration for the processor module.

use serde::{Deserialize, Serialize};

/// Per-scan processing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Recompute payloads even when they are already cached.
    #[serde(default)]
    pub reset: bool,

    /// Score sampled instances on a blocking worker pool instead of inline.
    #[serde(default)]
    pub instance_parallel: bool,

    /// Concurrent scoring tasks per scan when `instance_parallel` is set.
    #[serde(default = "default_instance_workers")]
    pub instance_workers: usize,

    /// Fixed sampling seed. Leave unset outside of tests.
    #[serde(default)]
    pub sample_seed: Option<u64>,
}

fn default_instance_workers() -> usize {
    4
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            reset: false,
            instance_parallel: false,
            instance_workers: default_instance_workers(),
            sample_seed: None,
        }
    }
}
