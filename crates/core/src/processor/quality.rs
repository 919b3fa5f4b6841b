//! Quality report construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::archive::Instance;
use crate::piqe;
use crate::sampler::Sampler;

use super::config::ProcessorConfig;
use super::types::QualityError;

/// One scored instance or frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstanceScore {
    pub piqe_score: f64,
}

/// The persisted quality payload. Keys are instance UIDs, with a `-<frame>`
/// suffix for frames drawn from a multi-frame instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub instances: BTreeMap<String, InstanceScore>,
    pub average_piqe_score: f64,
}

impl QualityReport {
    fn from_entries(entries: BTreeMap<String, InstanceScore>) -> Self {
        let sum: f64 = entries.values().map(|s| s.piqe_score).sum();
        let average = sum / entries.len() as f64;
        Self {
            instances: entries,
            average_piqe_score: average,
        }
    }
}

/// Score a sample of the pool and serialize the report.
///
/// Any failing unit fails the whole report, so a cached report is only ever
/// replaced by a complete one.
pub(super) async fn build_quality_report(
    pool: &[Arc<dyn Instance>],
    sampler: &mut Sampler,
    config: &ProcessorConfig,
) -> Result<String, QualityError> {
    let indices = sampler.sample_indices(pool.len())?;
    debug!(pool = pool.len(), sampled = indices.len(), "scoring sample");

    let entries = if config.instance_parallel {
        score_parallel(pool, sampler, &indices, config.instance_workers).await?
    } else {
        score_sequential(pool, sampler, &indices)?
    };

    let report = QualityReport::from_entries(entries);
    serde_json::to_string(&report).map_err(|e| QualityError::Encode(e.to_string()))
}

fn score_sequential(
    pool: &[Arc<dyn Instance>],
    sampler: &mut Sampler,
    indices: &[usize],
) -> Result<BTreeMap<String, InstanceScore>, QualityError> {
    let mut entries = BTreeMap::new();
    for &idx in indices {
        let mut unit_sampler = sampler.fork();
        for (key, score) in score_instance(Arc::clone(&pool[idx]), &mut unit_sampler)? {
            entries.insert(key, InstanceScore { piqe_score: score });
        }
    }
    Ok(entries)
}

async fn score_parallel(
    pool: &[Arc<dyn Instance>],
    sampler: &mut Sampler,
    indices: &[usize],
    workers: usize,
) -> Result<BTreeMap<String, InstanceScore>, QualityError> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = FuturesUnordered::new();
    for &idx in indices {
        let instance = Arc::clone(&pool[idx]);
        // Forked before spawning so the draw order stays deterministic
        // under a fixed seed.
        let mut unit_sampler = sampler.fork();
        let semaphore = Arc::clone(&semaphore);
        tasks.push(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| QualityError::Join(e.to_string()))?;
            tokio::task::spawn_blocking(move || score_instance(instance, &mut unit_sampler))
                .await
                .map_err(|e| QualityError::Join(e.to_string()))?
        });
    }

    let mut entries = BTreeMap::new();
    while let Some(result) = tasks.next().await {
        for (key, score) in result? {
            entries.insert(key, InstanceScore { piqe_score: score });
        }
    }
    Ok(entries)
}

/// Fetch pixels and score one instance, expanding a multi-frame instance
/// into a sample of its frames.
fn score_instance(
    instance: Arc<dyn Instance>,
    sampler: &mut Sampler,
) -> Result<Vec<(String, f64)>, QualityError> {
    let pixels = instance.pixel_data()?;
    match sampler.sample_frames(&pixels)? {
        None => {
            let output = piqe::score(&pixels)?;
            Ok(vec![(instance.uid().to_string(), output.score)])
        }
        Some(frames) => {
            let mut scored = Vec::with_capacity(frames.len());
            for frame_idx in frames {
                let frame = pixels.frame(frame_idx).ok_or_else(|| {
                    QualityError::Score(crate::piqe::PiqeError::InvalidImage(format!(
                        "frame {} out of range",
                        frame_idx
                    )))
                })?;
                let output = piqe::score(&frame)?;
                scored.push((format!("{}-{}", instance.uid(), frame_idx), output.score));
            }
            Ok(scored)
        }
    }
}
