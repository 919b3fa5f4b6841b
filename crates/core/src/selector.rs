//! Instance ordering and filtering ahead of sampling.
//!
//! Instances come back from the archive in arbitrary order. The selector
//! imposes a total order from whichever positional tag is available, drops
//! the leading slices (frequently calibration noise), and removes scout,
//! localizer and b0 acquisitions that would poison a quality score.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::archive::{Instance, TagValue};

/// Substrings that mark an instance as non-diagnostic. Matched
/// case-insensitively against type and description tags.
const DISALLOWED_TERMS: [&str; 3] = ["scout", "localizer", "b0"];

/// Leading instances dropped from a sorted pool, when the pool is larger.
const LEADING_DROP: usize = 3;

/// Tags consulted for the disallowed-term filter, beyond `ImageType`.
const DESCRIPTION_TAGS: [&str; 3] = ["SeriesDescription", "ProtocolName", "SequenceName"];

#[derive(Debug, Clone, PartialEq)]
enum KeyValue {
    Number(f64),
    Position(Vec<f64>),
    Text(String),
}

/// Sort key: tag precedence rank, then the tag's value, then the instance
/// UID as a final tiebreak so the order is total.
#[derive(Debug, Clone)]
struct OrderKey {
    rank: u8,
    value: KeyValue,
    uid: String,
}

impl OrderKey {
    fn compare(&self, other: &OrderKey) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| compare_values(&self.value, &other.value))
            .then_with(|| self.uid.cmp(&other.uid))
    }
}

fn compare_values(a: &KeyValue, b: &KeyValue) -> Ordering {
    match (a, b) {
        (KeyValue::Number(x), KeyValue::Number(y)) => x.total_cmp(y),
        (KeyValue::Position(x), KeyValue::Position(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                let ord = xi.total_cmp(yi);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (KeyValue::Text(x), KeyValue::Text(y)) => x.cmp(y),
        // Same rank implies same variant; keep a stable answer anyway.
        _ => Ordering::Equal,
    }
}

fn numeric_tag(instance: &dyn Instance, name: &str) -> Option<f64> {
    instance.tag(name).and_then(|v| v.as_f64())
}

fn numeric_list_tag(instance: &dyn Instance, name: &str) -> Option<Vec<f64>> {
    match instance.tag(name)? {
        TagValue::List(items) => items.iter().map(|v| v.as_f64()).collect(),
        other => other.as_f64().map(|v| vec![v]),
    }
}

fn text_tag(instance: &dyn Instance, name: &str) -> Option<String> {
    instance
        .tag(name)
        .and_then(|v| v.as_str().map(str::to_string))
}

/// First available key wins: InstanceNumber, then ImagePositionPatient,
/// then SliceLocation, then AcquisitionTime, then the UID itself.
fn order_key(instance: &dyn Instance) -> OrderKey {
    let uid = instance.uid().to_string();
    if let Some(number) = numeric_tag(instance, "InstanceNumber") {
        return OrderKey {
            rank: 0,
            value: KeyValue::Number(number),
            uid,
        };
    }
    if let Some(position) = numeric_list_tag(instance, "ImagePositionPatient") {
        return OrderKey {
            rank: 1,
            value: KeyValue::Position(position),
            uid,
        };
    }
    if let Some(location) = numeric_tag(instance, "SliceLocation") {
        return OrderKey {
            rank: 2,
            value: KeyValue::Number(location),
            uid,
        };
    }
    if let Some(time) = text_tag(instance, "AcquisitionTime") {
        return OrderKey {
            rank: 3,
            value: KeyValue::Text(time),
            uid,
        };
    }
    OrderKey {
        rank: 4,
        value: KeyValue::Text(uid.clone()),
        uid,
    }
}

fn contains_disallowed_term(text: &str) -> bool {
    let lowered = text.to_lowercase();
    DISALLOWED_TERMS.iter().any(|term| lowered.contains(term))
}

fn is_disallowed(instance: &dyn Instance) -> bool {
    if let Some(image_type) = instance.tag("ImageType") {
        if image_type
            .text_values()
            .iter()
            .any(|value| contains_disallowed_term(value))
        {
            return true;
        }
    }
    DESCRIPTION_TAGS.iter().any(|tag| {
        text_tag(instance, tag)
            .map(|value| contains_disallowed_term(&value))
            .unwrap_or(false)
    })
}

/// Sort, drop the leading slices, and filter out disallowed instances.
/// The result may be empty; callers treat that as nothing to score.
pub fn select_instances(instances: Vec<Arc<dyn Instance>>) -> Vec<Arc<dyn Instance>> {
    let mut keyed: Vec<(OrderKey, Arc<dyn Instance>)> = instances
        .into_iter()
        .map(|instance| (order_key(instance.as_ref()), instance))
        .collect();
    keyed.sort_by(|a, b| a.0.compare(&b.0));

    let skip = if keyed.len() > LEADING_DROP {
        LEADING_DROP
    } else {
        0
    };
    keyed
        .into_iter()
        .skip(skip)
        .map(|(_, instance)| instance)
        .filter(|instance| !is_disallowed(instance.as_ref()))
        .collect()
}
