//! End-to-end pipeline tests: index, dispatch, score, persist, upload.

use std::path::PathBuf;
use std::sync::Arc;

use radiqa_core::testing::{fixtures, MockArchive};
use radiqa_core::{
    ArchiveClient, ArchiveError, Connector, Dispatcher, DispatcherConfig, ProcessorConfig,
    QualityReport, ScanKey, ScanStore, SqliteScanStore, StoreError,
};

/// Connector over a mock archive and a shared on-disk store. Every call
/// opens a fresh store connection, like production workers do.
struct TestConnector {
    archive: Arc<MockArchive>,
    db_path: PathBuf,
}

impl Connector for TestConnector {
    fn connect_archive(&self) -> Result<Arc<dyn ArchiveClient>, ArchiveError> {
        Ok(Arc::clone(&self.archive) as Arc<dyn ArchiveClient>)
    }

    fn connect_store(&self) -> Result<Arc<dyn ScanStore>, StoreError> {
        Ok(Arc::new(SqliteScanStore::new(&self.db_path)?))
    }
}

struct TestHarness {
    archive: Arc<MockArchive>,
    connector: Arc<TestConnector>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let db_path = temp_dir.path().join("scans.db");
        let archive = Arc::new(MockArchive::new());
        let connector = Arc::new(TestConnector {
            archive: Arc::clone(&archive),
            db_path,
        });
        Self {
            archive,
            connector,
            _temp_dir: temp_dir,
        }
    }

    fn store(&self) -> Arc<dyn ScanStore> {
        self.connector.connect_store().expect("open store")
    }

    fn dispatcher(&self, config: DispatcherConfig) -> Dispatcher {
        let processor_config = ProcessorConfig {
            sample_seed: Some(42),
            ..ProcessorConfig::default()
        };
        Dispatcher::new(
            config,
            processor_config,
            Arc::clone(&self.connector) as Arc<dyn Connector>,
        )
    }

    fn filters(project: &str) -> radiqa_core::config::FilterConfig {
        radiqa_core::config::FilterConfig {
            projects: vec![project.to_string()],
            subjects: None,
            experiments: None,
            scans: None,
        }
    }

    async fn seed_scan(&self, key: &ScanKey, modality: &str, instances: usize) {
        self.store()
            .insert_scans(&[fixtures::scan_record(key.clone(), modality)])
            .expect("insert scan");
        self.archive
            .set_instances(key.clone(), fixtures::mr_instance_pool(instances))
            .await;
    }
}

#[tokio::test]
async fn test_end_to_end_scoring_and_persistence() {
    let harness = TestHarness::new();
    let key = fixtures::scan_key("neuro-01", "subj-1", "exp-1", "3");
    harness.seed_scan(&key, "MR", 13).await;

    let summary = harness
        .dispatcher(DispatcherConfig::default())
        .run(&TestHarness::filters("neuro-01"))
        .await
        .expect("run succeeds");

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.duration.as_nanos() > 0);

    let record = harness.store().get(&key).expect("query").expect("record");
    let report: QualityReport =
        serde_json::from_str(record.quality_report.as_deref().expect("report")).expect("json");
    // 13 instances, 3 leading slices dropped, all 10 survivors sampled.
    assert_eq!(report.instances.len(), 10);
    let mean = report.instances.values().map(|s| s.piqe_score).sum::<f64>() / 10.0;
    assert!((report.average_piqe_score - mean).abs() < 1e-9);
    assert!(report
        .instances
        .values()
        .all(|s| (0.0..=100.0).contains(&s.piqe_score)));

    // The acquisition profile landed too, and both payloads were uploaded.
    let profile: serde_json::Value =
        serde_json::from_str(record.acquisition_profile.as_deref().expect("profile"))
            .expect("json");
    assert_eq!(profile["Modality"], serde_json::json!("MR"));
    let uploads = harness.archive.uploads().await;
    assert!(uploads.iter().any(|(k, _, name)| k == &key && name == "quality"));
    assert!(uploads
        .iter()
        .any(|(k, _, name)| k == &key && name == "acquisition"));
}

#[tokio::test]
async fn test_second_run_does_not_recompute() {
    let harness = TestHarness::new();
    let key = fixtures::scan_key("neuro-01", "subj-1", "exp-1", "3");
    harness.seed_scan(&key, "MR", 13).await;
    let dispatcher = harness.dispatcher(DispatcherConfig::default());
    let filters = TestHarness::filters("neuro-01");

    dispatcher.run(&filters).await.expect("first run");
    let fetches_after_first = harness.archive.instance_list_calls().await.len();
    let payload_after_first = harness
        .store()
        .get(&key)
        .unwrap()
        .unwrap()
        .quality_report
        .unwrap();

    let summary = dispatcher.run(&filters).await.expect("second run");

    // The cached scan is skipped without touching the archive.
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.processed, 0);
    assert_eq!(
        harness.archive.instance_list_calls().await.len(),
        fetches_after_first
    );
    let payload_after_second = harness
        .store()
        .get(&key)
        .unwrap()
        .unwrap()
        .quality_report
        .unwrap();
    assert_eq!(payload_after_first, payload_after_second);
}

#[tokio::test]
async fn test_reset_replaces_cached_payloads() {
    let harness = TestHarness::new();
    let key = fixtures::scan_key("neuro-01", "subj-1", "exp-1", "3");
    harness.seed_scan(&key, "MR", 13).await;
    let store = harness.store();
    store
        .update_quality_report(&key, r#"{"stale":true}"#)
        .unwrap();
    store
        .update_acquisition_profile(&key, r#"{"stale":true}"#)
        .unwrap();

    let dispatcher = Dispatcher::new(
        DispatcherConfig::default(),
        ProcessorConfig {
            reset: true,
            sample_seed: Some(42),
            ..ProcessorConfig::default()
        },
        Arc::clone(&harness.connector) as Arc<dyn Connector>,
    );
    let summary = dispatcher
        .run(&TestHarness::filters("neuro-01"))
        .await
        .expect("run");
    assert_eq!(summary.processed, 1);

    let record = harness.store().get(&key).unwrap().unwrap();
    let report: QualityReport =
        serde_json::from_str(record.quality_report.as_deref().unwrap()).expect("fresh report");
    assert_eq!(report.instances.len(), 10);
    assert!(!record.acquisition_profile.unwrap().contains("stale"));
}

#[tokio::test]
async fn test_failing_scan_does_not_poison_siblings() {
    let harness = TestHarness::new();
    let good = fixtures::scan_key("neuro-01", "subj-1", "exp-1", "3");
    let bad = fixtures::scan_key("neuro-01", "subj-1", "exp-1", "4");
    harness.seed_scan(&good, "MR", 13).await;
    harness.seed_scan(&bad, "MR", 13).await;
    harness.archive.fail_instances_for(bad.clone()).await;

    let summary = harness
        .dispatcher(DispatcherConfig {
            scan_parallel: true,
            scan_workers: 4,
            ..DispatcherConfig::default()
        })
        .run(&TestHarness::filters("neuro-01"))
        .await
        .expect("run survives scan failure");

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    let failed_keys: Vec<_> = summary
        .results
        .iter()
        .filter(|r| r.outcome.is_err())
        .map(|r| r.key.clone())
        .collect();
    assert_eq!(failed_keys, vec![bad]);
    assert!(harness
        .store()
        .get(&good)
        .unwrap()
        .unwrap()
        .quality_report
        .is_some());
}

#[tokio::test]
async fn test_index_pass_feeds_the_run() {
    let harness = TestHarness::new();
    let key = fixtures::scan_key("neuro-01", "subj-1", "exp-1", "3");
    harness
        .archive
        .set_scans("neuro-01", vec![fixtures::scan_listing(key.clone(), "MR")])
        .await;
    harness
        .archive
        .set_instances(key.clone(), fixtures::mr_instance_pool(13))
        .await;

    let summary = harness
        .dispatcher(DispatcherConfig {
            index: true,
            ..DispatcherConfig::default()
        })
        .run(&TestHarness::filters("neuro-01"))
        .await
        .expect("run");

    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.processed, 1);
    assert!(harness
        .store()
        .get(&key)
        .unwrap()
        .unwrap()
        .quality_report
        .is_some());
}

#[tokio::test]
async fn test_parallel_and_sequential_agree() {
    let sequential = TestHarness::new();
    let parallel = TestHarness::new();
    let key = fixtures::scan_key("neuro-01", "subj-1", "exp-1", "3");
    sequential.seed_scan(&key, "MR", 13).await;
    parallel.seed_scan(&key, "MR", 13).await;

    sequential
        .dispatcher(DispatcherConfig::default())
        .run(&TestHarness::filters("neuro-01"))
        .await
        .expect("sequential run");
    parallel
        .dispatcher(DispatcherConfig {
            scan_parallel: true,
            scan_workers: 8,
            ..DispatcherConfig::default()
        })
        .run(&TestHarness::filters("neuro-01"))
        .await
        .expect("parallel run");

    let a = sequential.store().get(&key).unwrap().unwrap();
    let b = parallel.store().get(&key).unwrap().unwrap();
    assert_eq!(a.quality_report, b.quality_report);
    assert_eq!(a.acquisition_profile, b.acquisition_profile);
}
