//! Scan store - the local cache of archive scans and their computed payloads.
//!
//! Each scan row carries identity, modality and type from the archive plus
//! two opaque JSON payloads computed by the pipeline: the quality report and
//! the acquisition profile. Payload updates are individual immediate writes,
//! so a crash between the two fields leaves the first one durably stored.

mod sqlite;
mod types;

pub use sqlite::SqliteScanStore;
pub use types::{ScanFilter, ScanRecord};

use thiserror::Error;

use crate::archive::ScanKey;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Scan row not found.
    #[error("scan not found: {0}")]
    NotFound(String),
    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Trait for scan storage backends.
pub trait ScanStore: Send + Sync {
    /// Insert scans not yet known, identified by
    /// (project, subject, experiment, scan). Returns how many were new.
    fn insert_scans(&self, scans: &[ScanRecord]) -> Result<usize, StoreError>;

    /// List scans matching the filter.
    fn find_scans(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>, StoreError>;

    /// Get one scan by identity.
    fn get(&self, key: &ScanKey) -> Result<Option<ScanRecord>, StoreError>;

    /// Durably replace the quality report payload of one scan.
    fn update_quality_report(&self, key: &ScanKey, payload: &str) -> Result<(), StoreError>;

    /// Durably replace the acquisition profile payload of one scan.
    fn update_acquisition_profile(&self, key: &ScanKey, payload: &str) -> Result<(), StoreError>;
}
