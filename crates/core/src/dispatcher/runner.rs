//! The dispatcher itself.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::archive::ScanKey;
use crate::config::FilterConfig;
use crate::indexer;
use crate::processor::{ProcessError, ProcessorConfig, ScanProcessor};
use crate::store::{ScanFilter, ScanStore};

use super::config::DispatcherConfig;
use super::types::{DispatchError, RunSummary, ScanResult};
use super::Connector;

/// Hard ceiling on concurrent scan workers.
const MAX_SCAN_WORKERS: usize = 60;

pub struct Dispatcher {
    config: DispatcherConfig,
    processor_config: ProcessorConfig,
    connector: Arc<dyn Connector>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        processor_config: ProcessorConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            processor_config,
            connector,
        }
    }

    /// Execute one run: optional indexing, then every scan the filters
    /// select. Returns a summary; per-scan failures are recorded in it and
    /// never abort the run.
    pub async fn run(&self, filters: &FilterConfig) -> Result<RunSummary, DispatchError> {
        let started = Instant::now();

        let mut indexed = 0;
        if self.config.index {
            let archive = self.connector.connect_archive()?;
            let store = self.connector.connect_store()?;
            indexed = indexer::index_projects(archive.as_ref(), store.as_ref(), &filters.projects)
                .await?;
        }

        let store = self.connector.connect_store()?;
        let keys = build_work_list(store.as_ref(), filters)?;
        drop(store);
        info!(scans = keys.len(), "work list built");

        let results = if self.config.scan_parallel {
            self.run_parallel(keys).await?
        } else {
            self.run_sequential(keys).await?
        };

        let summary = RunSummary::from_results(results, indexed, started.elapsed());
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            indexed = summary.indexed,
            duration_secs = summary.duration.as_secs_f64(),
            "run finished"
        );
        Ok(summary)
    }

    async fn run_sequential(&self, keys: Vec<ScanKey>) -> Result<Vec<ScanResult>, DispatchError> {
        let archive = self.connector.connect_archive()?;
        let store = self.connector.connect_store()?;
        let processor = ScanProcessor::new(self.processor_config.clone(), archive, store);

        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let outcome = processor.process_scan(&key).await;
            if let Err(error) = &outcome {
                error!(scan = %key, %error, "scan processing failed");
            }
            results.push(ScanResult { key, outcome });
        }
        Ok(results)
    }

    async fn run_parallel(&self, keys: Vec<ScanKey>) -> Result<Vec<ScanResult>, DispatchError> {
        let workers = self.config.scan_workers.clamp(1, MAX_SCAN_WORKERS);
        info!(workers, "dispatching scan workers");
        let semaphore = Arc::new(Semaphore::new(workers));

        let mut tasks = FuturesUnordered::new();
        for key in keys {
            let connector = Arc::clone(&self.connector);
            let processor_config = self.processor_config.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.push(tokio::spawn(async move {
                let outcome = process_one(connector, processor_config, &key, semaphore).await;
                if let Err(error) = &outcome {
                    error!(scan = %key, %error, "scan processing failed");
                }
                ScanResult { key, outcome }
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => return Err(DispatchError::Join(e.to_string())),
            }
        }
        Ok(results)
    }
}

/// The body of one scan worker. The worker owns its connections; only the
/// key was moved in.
async fn process_one(
    connector: Arc<dyn Connector>,
    processor_config: ProcessorConfig,
    key: &ScanKey,
    semaphore: Arc<Semaphore>,
) -> Result<crate::processor::ScanOutcome, ProcessError> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| ProcessError::Join(e.to_string()))?;
    let archive = connector.connect_archive()?;
    let store = connector.connect_store()?;
    ScanProcessor::new(processor_config, archive, store)
        .process_scan(key)
        .await
}

/// Expand the filter lists into store queries and collect the matching
/// scans once each, preserving first-seen order.
fn build_work_list(
    store: &dyn ScanStore,
    filters: &FilterConfig,
) -> Result<Vec<ScanKey>, DispatchError> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for filter in expand_filters(filters) {
        for record in store.find_scans(&filter)? {
            if seen.insert(record.key.clone()) {
                keys.push(record.key);
            }
        }
    }
    Ok(keys)
}

fn expand_filters(filters: &FilterConfig) -> Vec<ScanFilter> {
    fn level(values: &Option<Vec<String>>) -> Vec<Option<String>> {
        match values {
            Some(list) if !list.is_empty() => list.iter().cloned().map(Some).collect(),
            _ => vec![None],
        }
    }

    let projects: Vec<Option<String>> = if filters.projects.is_empty() {
        vec![None]
    } else {
        filters.projects.iter().cloned().map(Some).collect()
    };
    let subjects = level(&filters.subjects);
    let experiments = level(&filters.experiments);
    let scans = level(&filters.scans);

    let mut expanded = Vec::new();
    for project in &projects {
        for subject in &subjects {
            for experiment in &experiments {
                for scan in &scans {
                    expanded.push(ScanFilter {
                        project: project.clone(),
                        subject: subject.clone(),
                        experiment: experiment.clone(),
                        scan: scan.clone(),
                    });
                }
            }
        }
    }
    expanded
}
