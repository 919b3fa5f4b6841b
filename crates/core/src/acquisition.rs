//! Acquisition profile extraction.
//!
//! A profile is a flat map of acquisition tags read from one randomly chosen
//! representative of the pool. The tag set depends on the modality; tags the
//! instance does not carry are recorded as `null` so a profile always has
//! the same shape for a given modality.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::archive::Instance;
use crate::sampler::{SampleError, Sampler};

/// Tags collected for every supported modality.
const COMMON_TAGS: &[&str] = &[
    "StudyInstanceUID",
    "SeriesInstanceUID",
    "Manufacturer",
    "Modality",
    "ImageType",
    "SliceThickness",
    "SpacingBetweenSlices",
    "ImagePositionPatient",
    "ImageOrientationPatient",
    "PixelSpacing",
];

/// MR-specific tags.
const MR_TAGS: &[&str] = &[
    "ContrastBolusAgent",
    "ScanningSequence",
    "SequenceVariant",
    "ScanOptions",
    "MRAcquisitionType",
    "SequenceName",
    "RepetitionTime",
    "EchoTime",
    "MagneticFieldStrength",
    "EchoTrainLength",
    "FlipAngle",
    "ContrastBolusUsageSequence",
    "ContrastBolusAgentPhase",
];

/// X-ray exposure tags shared by CT and MG.
const CT_MG_SHARED_TAGS: &[&str] = &[
    "KVP",
    "FocalSpots",
    "DistanceSourceToDetector",
    "DistanceSourceToPatient",
    "ExposureTime",
    "XRayTubeCurrentInmA",
    "Exposure",
    "FilterType",
];

/// CT-specific geometry and reconstruction tags.
const CT_TAGS: &[&str] = &[
    "GantryDetectorTilt",
    "TableHeight",
    "ConvolutionKernel",
    "SpiralPitchFactor",
];

/// Mammography-specific tags.
const MG_TAGS: &[&str] = &[
    "BodyPartThickness",
    "CompressionForce",
    "ViewPosition",
    "ImageLaterality",
];

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error("failed to encode acquisition profile: {0}")]
    Encode(String),
}

fn tag_set(modality: &str) -> Option<Vec<&'static str>> {
    let extra: &[&[&str]] = match modality {
        "MR" => &[MR_TAGS],
        "CT" => &[CT_MG_SHARED_TAGS, CT_TAGS],
        "MG" => &[CT_MG_SHARED_TAGS, MG_TAGS],
        _ => return None,
    };
    let mut tags: Vec<&'static str> = COMMON_TAGS.to_vec();
    for group in extra {
        tags.extend_from_slice(group);
    }
    Some(tags)
}

/// Extract an acquisition profile from one random instance of the pool.
///
/// Returns `Ok(None)` when the representative's modality has no tag set;
/// that is an expected outcome, not a failure.
pub fn extract_profile(
    pool: &[Arc<dyn Instance>],
    sampler: &mut Sampler,
) -> Result<Option<String>, AcquisitionError> {
    let representative = &pool[sampler.pick_one(pool.len())?];
    let modality = representative
        .tag("Modality")
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default();
    let Some(tags) = tag_set(&modality) else {
        return Ok(None);
    };

    let mut profile = Map::new();
    for tag in tags {
        let value = representative
            .tag(tag)
            .map(|v| v.to_json())
            .unwrap_or(Value::Null);
        profile.insert(tag.to_string(), value);
    }
    if profile.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(&Value::Object(profile))
        .map(Some)
        .map_err(|e| AcquisitionError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::TagValue;
    use crate::testing::MockInstance;

    fn single(instance: MockInstance) -> Vec<Arc<dyn Instance>> {
        vec![Arc::new(instance) as Arc<dyn Instance>]
    }

    fn parse(profile: &str) -> serde_json::Map<String, Value> {
        match serde_json::from_str(profile).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_ct_profile_includes_shared_and_ct_tags() {
        let instance = MockInstance::new("ct-1")
            .with_tag("Modality", TagValue::Str("CT".into()))
            .with_tag("KVP", TagValue::Num(120.0))
            .with_tag("ConvolutionKernel", TagValue::Str("B30f".into()));
        let mut sampler = Sampler::seeded(1);
        let profile = extract_profile(&single(instance), &mut sampler)
            .unwrap()
            .unwrap();
        let map = parse(&profile);
        assert_eq!(map["Modality"], Value::String("CT".into()));
        assert_eq!(map["KVP"], serde_json::json!(120.0));
        assert_eq!(map["ConvolutionKernel"], Value::String("B30f".into()));
        // Missing tags are still present, as nulls.
        assert_eq!(map["GantryDetectorTilt"], Value::Null);
        assert_eq!(map["ExposureTime"], Value::Null);
        // No MR or MG tags leak into a CT profile.
        assert!(!map.contains_key("EchoTime"));
        assert!(!map.contains_key("CompressionForce"));
    }

    #[test]
    fn test_mr_profile_tag_set() {
        let instance = MockInstance::new("mr-1")
            .with_tag("Modality", TagValue::Str("MR".into()))
            .with_tag("EchoTime", TagValue::Num(4.2))
            .with_tag(
                "ImageType",
                TagValue::List(vec![
                    TagValue::Str("ORIGINAL".into()),
                    TagValue::Str("PRIMARY".into()),
                ]),
            );
        let mut sampler = Sampler::seeded(1);
        let profile = extract_profile(&single(instance), &mut sampler)
            .unwrap()
            .unwrap();
        let map = parse(&profile);
        assert_eq!(map["EchoTime"], serde_json::json!(4.2));
        assert_eq!(map["ImageType"], serde_json::json!(["ORIGINAL", "PRIMARY"]));
        assert!(!map.contains_key("KVP"));
        assert_eq!(map.len(), COMMON_TAGS.len() + MR_TAGS.len());
    }

    #[test]
    fn test_unlisted_modality_yields_no_profile() {
        let instance = MockInstance::new("pt-1").with_tag("Modality", TagValue::Str("PT".into()));
        let mut sampler = Sampler::seeded(1);
        assert!(extract_profile(&single(instance), &mut sampler)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_empty_pool_is_an_error() {
        let mut sampler = Sampler::seeded(1);
        assert!(matches!(
            extract_profile(&[], &mut sampler),
            Err(AcquisitionError::Sample(SampleError::EmptyPool))
        ));
    }
}
