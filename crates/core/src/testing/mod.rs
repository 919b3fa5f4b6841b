//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits,
//! allowing end-to-end pipeline tests without a real archive.
//!
//! # Example
//!
//! ```rust,ignore
//! use radiqa_core::testing::{fixtures, MockArchive};
//!
//! let archive = MockArchive::new();
//! let key = fixtures::scan_key("proj", "subj", "exp", "3");
//! archive.set_instances(key.clone(), fixtures::mr_instance_pool(13)).await;
//! ```

mod mock_archive;

pub use mock_archive::{MockArchive, MockInstance};

/// Test fixtures and helper functions.
pub mod fixtures {
    use ndarray::ArrayD;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::archive::{ScanKey, ScanListing, TagValue};
    use crate::piqe::PixelData;
    use crate::store::ScanRecord;

    use super::MockInstance;

    /// A scan key with labels derived from the ids.
    pub fn scan_key(project: &str, subject: &str, experiment: &str, scan: &str) -> ScanKey {
        ScanKey {
            project_id: project.to_string(),
            project_name: format!("{}-name", project),
            subject_id: subject.to_string(),
            subject_label: format!("{}-label", subject),
            experiment_id: experiment.to_string(),
            experiment_label: format!("{}-label", experiment),
            scan_id: scan.to_string(),
        }
    }

    /// A store record with no cached payloads.
    pub fn scan_record(key: ScanKey, modality: &str) -> ScanRecord {
        ScanRecord {
            key,
            modality: modality.to_string(),
            scan_type: "SE".to_string(),
            quality_report: None,
            acquisition_profile: None,
        }
    }

    /// An archive listing matching [`scan_record`].
    pub fn scan_listing(key: ScanKey, modality: &str) -> ScanListing {
        ScanListing {
            key,
            modality: modality.to_string(),
            scan_type: "SE".to_string(),
        }
    }

    /// A deterministic noise frame; every test seed gives a distinct image.
    pub fn noise_pixels(rows: usize, cols: usize, seed: u64) -> PixelData {
        let mut rng = StdRng::seed_from_u64(seed);
        let data: Vec<u16> = (0..rows * cols).map(|_| rng.gen_range(0..1024)).collect();
        PixelData::U16(
            ArrayD::from_shape_vec(vec![rows, cols], data).expect("shape matches data"),
        )
    }

    /// A rank-3 noise stack, frames on the first axis.
    pub fn multi_frame_instance(uid: &str, frames: usize, rows: usize, cols: usize) -> MockInstance {
        let mut rng = StdRng::seed_from_u64(frames as u64);
        let data: Vec<u16> = (0..frames * rows * cols)
            .map(|_| rng.gen_range(0..1024))
            .collect();
        let pixels = PixelData::U16(
            ArrayD::from_shape_vec(vec![frames, rows, cols], data).expect("shape matches data"),
        );
        MockInstance::new(uid)
            .with_tag("Modality", TagValue::Str("MR".into()))
            .with_pixels(pixels)
    }

    /// A single-frame MR instance with noise pixels.
    pub fn noise_instance(uid: &str, seed: u64) -> MockInstance {
        MockInstance::new(uid)
            .with_tag("Modality", TagValue::Str("MR".into()))
            .with_pixels(noise_pixels(64, 64, seed))
    }

    /// A pool of `n` orderable MR instances with pixel data.
    pub fn mr_instance_pool(n: usize) -> Vec<MockInstance> {
        (0..n)
            .map(|i| {
                MockInstance::new(format!("inst-{:03}", i))
                    .with_tag("Modality", TagValue::Str("MR".into()))
                    .with_tag("InstanceNumber", TagValue::Num((i + 1) as f64))
                    .with_tag("EchoTime", TagValue::Num(4.2))
                    .with_pixels(noise_pixels(64, 64, i as u64))
            })
            .collect()
    }

    /// Like [`mr_instance_pool`] but without pixel data, so scoring fails
    /// while tag-only steps still work.
    pub fn tag_only_mr_pool(n: usize) -> Vec<MockInstance> {
        (0..n)
            .map(|i| {
                MockInstance::new(format!("inst-{:03}", i))
                    .with_tag("Modality", TagValue::Str("MR".into()))
                    .with_tag("InstanceNumber", TagValue::Num((i + 1) as f64))
            })
            .collect()
    }
}
