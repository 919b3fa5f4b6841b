//! Store record and filter types.

use serde::{Deserialize, Serialize};

use crate::archive::ScanKey;

/// One scan row: archive identity plus the two cached payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub key: ScanKey,
    pub modality: String,
    pub scan_type: String,
    /// Cached quality report JSON, `None` until computed.
    pub quality_report: Option<String>,
    /// Cached acquisition profile JSON, `None` until computed.
    pub acquisition_profile: Option<String>,
}

/// Filter for querying scans. Absent fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub project: Option<String>,
    pub subject: Option<String>,
    pub experiment: Option<String>,
    pub scan: Option<String>,
}

impl ScanFilter {
    /// Create an unrestricted filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one project id.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Restrict to one subject id.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Restrict to one experiment id.
    pub fn with_experiment(mut self, experiment: impl Into<String>) -> Self {
        self.experiment = Some(experiment.into());
        self
    }

    /// Restrict to one scan id.
    pub fn with_scan(mut self, scan: impl Into<String>) -> Self {
        self.scan = Some(scan.into());
        self
    }
}
