//! Run orchestration.
//!
//! A [`Dispatcher`] turns the configured filters into a flat work list of
//! scan keys, optionally reindexes the archive first, and drives the scans
//! either sequentially or through a bounded pool of workers. Only plain
//! scan keys cross into a worker; every worker builds its own archive and
//! store connections through a [`Connector`].

mod config;
mod runner;
mod types;

use std::sync::Arc;

use crate::archive::{ArchiveClient, ArchiveError};
use crate::store::{ScanStore, StoreError};

pub use config::DispatcherConfig;
pub use runner::Dispatcher;
pub use types::{DispatchError, RunSummary, ScanResult};

/// Builds fresh connections for workers. Connections are never shared
/// across workers.
pub trait Connector: Send + Sync {
    fn connect_archive(&self) -> Result<Arc<dyn ArchiveClient>, ArchiveError>;
    fn connect_store(&self) -> Result<Arc<dyn ScanStore>, StoreError>;
}
