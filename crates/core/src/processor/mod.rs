//! Per-scan processing.
//!
//! One [`ScanProcessor`] drives a scan from its stored record to persisted
//! payloads: fetch and select instances, score a sample, extract an
//! acquisition profile, then persist and upload each payload as soon as it
//! is complete. Step failures are contained to the step; only fetch and
//! persistence failures fail the scan.

mod config;
mod quality;
mod scan;
mod types;

pub use config::ProcessorConfig;
pub use quality::{InstanceScore, QualityReport};
pub use scan::ScanProcessor;
pub use types::{ProcessError, QualityError, ScanOutcome, SkipReason};
