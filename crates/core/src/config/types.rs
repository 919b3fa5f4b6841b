use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dispatcher::DispatcherConfig;
use crate::processor::ProcessorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

impl Config {
    /// Dispatcher-level view of this configuration.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            index: self.run.index,
            scan_parallel: self.concurrency.scan_parallel,
            scan_workers: self.concurrency.scan_workers,
        }
    }

    /// Processor-level view of this configuration.
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            reset: self.run.reset,
            instance_parallel: self.concurrency.instance_parallel,
            instance_workers: self.concurrency.instance_workers,
            sample_seed: self.run.sample_seed,
        }
    }
}

/// Archive server credentials and endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    pub server: String,
    pub user: String,
    pub password: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("radiqa.db")
}

/// Which scans a run addresses. An absent level means "all at that level".
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub subjects: Option<Vec<String>>,
    #[serde(default)]
    pub experiments: Option<Vec<String>>,
    #[serde(default)]
    pub scans: Option<Vec<String>>,
}

/// Run-control flags
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunConfig {
    /// Reindex the configured projects before processing.
    #[serde(default)]
    pub index: bool,
    /// Recompute payloads even when cached.
    #[serde(default)]
    pub reset: bool,
    /// Fixed sampling seed, for reproducible runs.
    #[serde(default)]
    pub sample_seed: Option<u64>,
}

/// Worker-pool sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConcurrencyConfig {
    #[serde(default)]
    pub scan_parallel: bool,
    #[serde(default = "default_scan_workers")]
    pub scan_workers: usize,
    #[serde(default)]
    pub instance_parallel: bool,
    #[serde(default = "default_instance_workers")]
    pub instance_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            scan_parallel: false,
            scan_workers: default_scan_workers(),
            instance_parallel: false,
            instance_workers: default_instance_workers(),
        }
    }
}

fn default_scan_workers() -> usize {
    8
}

fn default_instance_workers() -> usize {
    4
}
