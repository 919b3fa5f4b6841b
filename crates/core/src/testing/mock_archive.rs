//! Mock archive for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::archive::{ArchiveClient, ArchiveError, Instance, ScanKey, ScanListing, TagValue};
use crate::piqe::PixelData;

/// Mock implementation of the [`Instance`] trait: a UID, a tag map, and an
/// optional pixel buffer.
#[derive(Debug, Clone, Default)]
pub struct MockInstance {
    uid: String,
    tags: HashMap<String, TagValue>,
    pixels: Option<PixelData>,
}

impl MockInstance {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            tags: HashMap::new(),
            pixels: None,
        }
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: TagValue) -> Self {
        self.tags.insert(name.into(), value);
        self
    }

    pub fn with_pixels(mut self, pixels: PixelData) -> Self {
        self.pixels = Some(pixels);
        self
    }
}

impl Instance for MockInstance {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn tag(&self, name: &str) -> Option<TagValue> {
        self.tags.get(name).cloned()
    }

    fn pixel_data(&self) -> Result<PixelData, ArchiveError> {
        self.pixels
            .clone()
            .ok_or_else(|| ArchiveError::PixelData(format!("no pixel data for {}", self.uid)))
    }
}

/// Mock implementation of the [`ArchiveClient`] trait.
///
/// Provides controllable behavior for testing:
/// - Configurable scan listings per project
/// - Configurable instance pools per scan
/// - Injectable per-scan listing failures
/// - Recorded instance fetches and uploads for assertions
pub struct MockArchive {
    scans: RwLock<HashMap<String, Vec<ScanListing>>>,
    instances: RwLock<HashMap<ScanKey, Vec<Arc<dyn Instance>>>>,
    failing_scans: RwLock<HashSet<ScanKey>>,
    listed: RwLock<Vec<ScanKey>>,
    uploads: RwLock<Vec<(ScanKey, String, String)>>,
}

impl std::fmt::Debug for MockArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockArchive")
            .field("scans", &"<scans>")
            .field("instances", &"<instances>")
            .field("failing_scans", &"<failing_scans>")
            .field("listed", &"<listed>")
            .field("uploads", &"<uploads>")
            .finish()
    }
}

impl Default for MockArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArchive {
    pub fn new() -> Self {
        Self {
            scans: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            failing_scans: RwLock::new(HashSet::new()),
            listed: RwLock::new(Vec::new()),
            uploads: RwLock::new(Vec::new()),
        }
    }

    /// Configure the scan listings for a project.
    pub async fn set_scans(&self, project: &str, listings: Vec<ScanListing>) {
        self.scans.write().await.insert(project.to_string(), listings);
    }

    /// Configure the instance pool for a scan.
    pub async fn set_instances(&self, key: ScanKey, instances: Vec<MockInstance>) {
        let pool = instances
            .into_iter()
            .map(|i| Arc::new(i) as Arc<dyn Instance>)
            .collect();
        self.instances.write().await.insert(key, pool);
    }

    /// Make instance listing fail for one scan.
    pub async fn fail_instances_for(&self, key: ScanKey) {
        self.failing_scans.write().await.insert(key);
    }

    /// The scans whose instances were fetched, in call order.
    pub async fn instance_list_calls(&self) -> Vec<ScanKey> {
        self.listed.read().await.clone()
    }

    /// Recorded uploads as (scan, payload, resource name).
    pub async fn uploads(&self) -> Vec<(ScanKey, String, String)> {
        self.uploads.read().await.clone()
    }
}

#[async_trait]
impl ArchiveClient for MockArchive {
    async fn list_scans(&self, project: &str) -> Result<Vec<ScanListing>, ArchiveError> {
        self.scans
            .read()
            .await
            .get(project)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(format!("project {}", project)))
    }

    async fn list_instances(&self, scan: &ScanKey) -> Result<Vec<Arc<dyn Instance>>, ArchiveError> {
        self.listed.write().await.push(scan.clone());
        if self.failing_scans.read().await.contains(scan) {
            return Err(ArchiveError::Connection(format!(
                "injected failure for {}",
                scan
            )));
        }
        self.instances
            .read()
            .await
            .get(scan)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(format!("scan {}", scan)))
    }

    async fn upload_json(
        &self,
        scan: &ScanKey,
        payload: &str,
        name: &str,
    ) -> Result<(), ArchiveError> {
        self.uploads
            .write()
            .await
            .push((scan.clone(), payload.to_string(), name.to_string()));
        Ok(())
    }
}
