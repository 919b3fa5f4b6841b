//! Types for the processor module.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::piqe::PiqeError;
use crate::sampler::SampleError;
use crate::store::StoreError;

/// A failure that fails the whole scan.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("worker task failed: {0}")]
    Join(String),
}

/// A failure contained to the quality-scoring step. Any one of these leaves
/// the cached report untouched; a partial report is never written.
#[derive(Debug, Error)]
pub enum QualityError {
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Score(#[from] PiqeError),
    #[error(transparent)]
    Pixels(#[from] ArchiveError),
    #[error("scoring task failed: {0}")]
    Join(String),
    #[error("failed to encode quality report: {0}")]
    Encode(String),
}

/// Why a scan finished without any processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The scan is not in the local store.
    NotIndexed,
    /// Modality outside the supported set.
    UnsupportedModality,
    /// Both payloads already cached and no reset requested.
    UpToDate,
    /// Nothing left after selection and filtering.
    EmptyPool,
}

/// How a scan ended. An `Err(ProcessError)` is the third possibility,
/// reported by [`super::ScanProcessor::process_scan`] itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Skipped(SkipReason),
    Processed {
        quality_written: bool,
        acquisition_written: bool,
    },
}
