//! Archive collaborator traits.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{ArchiveError, ScanKey, ScanListing, TagValue};
use crate::piqe::PixelData;

/// One image instance within a scan: a tag map plus a pixel buffer.
///
/// Instances are read-only from the pipeline's perspective; the archive owns
/// them. Tag access never fails — a missing tag is `None`.
pub trait Instance: Send + Sync {
    /// The SOPInstanceUID, the instance's stable identity.
    fn uid(&self) -> &str;

    /// Look up a DICOM tag by keyword.
    fn tag(&self, name: &str) -> Option<TagValue>;

    /// Retrieve the pixel buffer. May hit the network.
    fn pixel_data(&self) -> Result<PixelData, ArchiveError>;
}

/// Client for the remote imaging archive.
///
/// Implementations are expected to be cheap to clone behind an `Arc`; each
/// scan worker constructs its own client from configuration.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// List every scan under a project.
    async fn list_scans(&self, project: &str) -> Result<Vec<ScanListing>, ArchiveError>;

    /// List the image instances belonging to one scan.
    async fn list_instances(&self, scan: &ScanKey)
        -> Result<Vec<Arc<dyn Instance>>, ArchiveError>;

    /// Upload a JSON payload as a named resource on the scan.
    async fn upload_json(
        &self,
        scan: &ScanKey,
        payload: &str,
        name: &str,
    ) -> Result<(), ArchiveError>;
}
