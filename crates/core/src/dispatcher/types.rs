//! Types for the dispatcher module.

use std::time::Duration;

use thiserror::Error;

use crate::archive::{ArchiveError, ScanKey};
use crate::indexer::IndexError;
use crate::processor::{ProcessError, ScanOutcome};
use crate::store::StoreError;

/// A failure that aborts the whole run. Per-scan failures never surface
/// here; they are collected in the [`RunSummary`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("scan worker panicked: {0}")]
    Join(String),
}

/// The recorded end state of one scan within a run.
#[derive(Debug)]
pub struct ScanResult {
    pub key: ScanKey,
    pub outcome: Result<ScanOutcome, ProcessError>,
}

/// What a run did, with per-scan detail.
#[derive(Debug)]
pub struct RunSummary {
    /// Scans that produced or refreshed at least their end state.
    pub processed: usize,
    /// Scans that finished without work to do.
    pub skipped: usize,
    /// Scans that failed; their errors are in `results`.
    pub failed: usize,
    /// New scans inserted by the indexing pass, when one ran.
    pub indexed: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    pub results: Vec<ScanResult>,
}

impl RunSummary {
    pub(super) fn from_results(
        results: Vec<ScanResult>,
        indexed: usize,
        duration: Duration,
    ) -> Self {
        let mut processed = 0;
        let mut skipped = 0;
        let mut failed = 0;
        for result in &results {
            match &result.outcome {
                Ok(ScanOutcome::Processed { .. }) => processed += 1,
                Ok(ScanOutcome::Skipped(_)) => skipped += 1,
                Err(_) => failed += 1,
            }
        }
        Self {
            processed,
            skipped,
            failed,
            indexed,
            duration,
            results,
        }
    }
}
