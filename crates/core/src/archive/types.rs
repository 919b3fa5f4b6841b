//! Types shared across the archive seam.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Could not establish or use a connection to the archive.
    #[error("archive connection error: {0}")]
    Connection(String),
    /// A requested element does not exist on the archive.
    #[error("archive element not found: {0}")]
    NotFound(String),
    /// Pixel data could not be retrieved or decoded.
    #[error("pixel data error: {0}")]
    PixelData(String),
    /// Uploading a resource failed.
    #[error("upload failed: {0}")]
    Upload(String),
}

/// Plain identity of one scan.
///
/// This is the only record that crosses a scan-worker boundary; live
/// connection handles never do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanKey {
    pub project_id: String,
    pub project_name: String,
    pub subject_id: String,
    pub subject_label: String,
    pub experiment_id: String,
    pub experiment_label: String,
    pub scan_id: String,
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "project: {} | subject: {} | experiment: {} | scan: {}",
            self.project_name, self.subject_label, self.experiment_label, self.scan_id
        )
    }
}

/// One scan as listed by the archive, identity plus descriptive fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanListing {
    pub key: ScanKey,
    pub modality: String,
    pub scan_type: String,
}

/// Value of one DICOM tag.
///
/// Multi-valued fields are represented as lists and flatten to ordered JSON
/// arrays when serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Str(String),
    Num(f64),
    List(Vec<TagValue>),
}

impl TagValue {
    /// Numeric view: a number, or a string that parses as one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Num(n) => Some(*n),
            TagValue::Str(s) => s.trim().parse().ok(),
            TagValue::List(_) => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The scalar text values carried by this tag: a string yields itself, a
    /// list yields its string elements.
    pub fn text_values(&self) -> Vec<&str> {
        match self {
            TagValue::Str(s) => vec![s.as_str()],
            TagValue::Num(_) => Vec::new(),
            TagValue::List(items) => items.iter().flat_map(|v| v.text_values()).collect(),
        }
    }

    /// Flatten to a JSON value (lists become ordered arrays).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TagValue::Str(s) => serde_json::Value::String(s.clone()),
            TagValue::Num(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            TagValue::List(items) => {
                serde_json::Value::Array(items.iter().map(TagValue::to_json).collect())
            }
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Str(s.to_string())
    }
}

impl From<f64> for TagValue {
    fn from(n: f64) -> Self {
        TagValue::Num(n)
    }
}
