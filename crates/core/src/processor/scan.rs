//! The per-scan state machine.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::acquisition;
use crate::archive::{ArchiveClient, ScanKey};
use crate::sampler::Sampler;
use crate::selector;
use crate::store::ScanStore;

use super::config::ProcessorConfig;
use super::quality::build_quality_report;
use super::types::{ProcessError, ScanOutcome, SkipReason};

/// Modalities the pipeline knows how to handle.
const SUPPORTED_MODALITIES: [&str; 3] = ["MR", "CT", "MG"];

/// Archive resource name for the quality payload.
const QUALITY_RESOURCE: &str = "quality";
/// Archive resource name for the acquisition payload.
const ACQUISITION_RESOURCE: &str = "acquisition";

/// Processes one scan at a time against a store and an archive connection.
pub struct ScanProcessor {
    config: ProcessorConfig,
    archive: Arc<dyn ArchiveClient>,
    store: Arc<dyn ScanStore>,
}

impl ScanProcessor {
    pub fn new(
        config: ProcessorConfig,
        archive: Arc<dyn ArchiveClient>,
        store: Arc<dyn ScanStore>,
    ) -> Self {
        Self {
            config,
            archive,
            store,
        }
    }

    /// Drive a scan to completion.
    ///
    /// Each payload is recomputed only when missing or when `reset` is set,
    /// and is persisted then uploaded as soon as it is ready, so a crash
    /// mid-scan loses at most the payload in flight. A scoring or
    /// extraction failure is logged and skipped; the scan still completes.
    pub async fn process_scan(&self, key: &ScanKey) -> Result<ScanOutcome, ProcessError> {
        let Some(record) = self.store.get(key)? else {
            warn!(scan = %key, "scan not present in store");
            return Ok(ScanOutcome::Skipped(SkipReason::NotIndexed));
        };
        if !SUPPORTED_MODALITIES.contains(&record.modality.as_str()) {
            debug!(scan = %key, modality = %record.modality, "unsupported modality");
            return Ok(ScanOutcome::Skipped(SkipReason::UnsupportedModality));
        }

        let needs_quality = self.config.reset || record.quality_report.is_none();
        let needs_acquisition = self.config.reset || record.acquisition_profile.is_none();
        if !needs_quality && !needs_acquisition {
            debug!(scan = %key, "payloads cached, nothing to do");
            return Ok(ScanOutcome::Skipped(SkipReason::UpToDate));
        }

        let instances = self.archive.list_instances(key).await?;
        let pool = selector::select_instances(instances);
        if pool.is_empty() {
            info!(scan = %key, "no scoreable instances after selection");
            return Ok(ScanOutcome::Skipped(SkipReason::EmptyPool));
        }

        let mut sampler = match self.config.sample_seed {
            Some(seed) => Sampler::seeded(seed),
            None => Sampler::new(),
        };

        let mut quality_written = false;
        if needs_quality {
            match build_quality_report(&pool, &mut sampler, &self.config).await {
                Ok(payload) => {
                    self.store.update_quality_report(key, &payload)?;
                    self.archive
                        .upload_json(key, &payload, QUALITY_RESOURCE)
                        .await?;
                    info!(scan = %key, "quality report written");
                    quality_written = true;
                }
                Err(error) => {
                    warn!(scan = %key, %error, "quality scoring failed, cached report kept");
                }
            }
        }

        let mut acquisition_written = false;
        if needs_acquisition {
            match acquisition::extract_profile(&pool, &mut sampler) {
                Ok(Some(payload)) => {
                    self.store.update_acquisition_profile(key, &payload)?;
                    self.archive
                        .upload_json(key, &payload, ACQUISITION_RESOURCE)
                        .await?;
                    info!(scan = %key, "acquisition profile written");
                    acquisition_written = true;
                }
                Ok(None) => {
                    debug!(scan = %key, "no acquisition profile for this modality");
                }
                Err(error) => {
                    warn!(scan = %key, %error, "acquisition extraction failed");
                }
            }
        }

        Ok(ScanOutcome::Processed {
            quality_written,
            acquisition_written,
        })
    }
}
