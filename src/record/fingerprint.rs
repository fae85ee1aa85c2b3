use serde_json::{Map, Value};

use super::keys;
use crate::error::RecordError;

/// Resolution order for the plain timestamp of a record.
const TIMESTAMP_CANDIDATES: [&str; 3] = [
    keys::TIMESTAMP_START,
    keys::TIMESTAMP,
    keys::TIMESTAMP_END,
];

/// Resolution order for the display name of a record.
const NAME_CANDIDATES: [&str; 2] = [keys::MEASUREMENT_NAME, keys::NAME];

/// Derive the identity fingerprint of a measurement record: the resolved
/// timestamp, `device.id`, `device.type` and the resolved measurement name,
/// concatenated as strings.
///
/// No normalization is applied to the source values, so device ids that
/// serialize differently (`3` vs `"3"` vs `3.0`) produce different
/// fingerprints. This is a convenience key for deduplication, not a content
/// hash, and makes no collision-resistance claims.
pub fn fingerprint(record: &Map<String, Value>) -> Result<String, RecordError> {
    let device = record
        .get(keys::DEVICE)
        .and_then(Value::as_object)
        .ok_or_else(|| RecordError::missing(keys::DEVICE))?;
    let device_id = device
        .get(keys::DEVICE_ID)
        .ok_or_else(|| RecordError::missing("device.id"))?;
    let device_type = device
        .get(keys::DEVICE_TYPE)
        .ok_or_else(|| RecordError::missing("device.type"))?;

    let timestamp = resolve_iso_timestamp(record)
        .map(Ok)
        .unwrap_or_else(|| resolve_timestamp(record))?;
    let name = resolve_name(record)?;

    let mut hash = timestamp;
    hash.push_str(&value_key_str(device_id));
    hash.push_str(&value_key_str(device_type));
    hash.push_str(&name);
    Ok(hash)
}

/// First present key of `timestamp start`, `timestamp`, `timestamp end`.
pub fn resolve_timestamp(record: &Map<String, Value>) -> Result<String, RecordError> {
    resolve_first(record, &TIMESTAMP_CANDIDATES)
        .ok_or_else(|| RecordError::missing(TIMESTAMP_CANDIDATES.join(" or ")))
}

/// First present key of `measurement name`, `name`.
pub fn resolve_name(record: &Map<String, Value>) -> Result<String, RecordError> {
    resolve_first(record, &NAME_CANDIDATES)
        .ok_or_else(|| RecordError::missing(NAME_CANDIDATES.join(" or ")))
}

/// `timestamp iso start` when present, else the resolved plain timestamp.
/// Optional: records imported from other tools may carry neither.
pub fn resolve_iso_timestamp(record: &Map<String, Value>) -> Option<String> {
    resolve_first(record, &[keys::TIMESTAMP_ISO_START])
        .or_else(|| resolve_timestamp(record).ok())
}

fn resolve_first(record: &Map<String, Value>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|key| record.get(*key).map(value_key_str))
}

/// String values contribute their bare contents; any other JSON value
/// contributes its compact rendering.
fn value_key_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_record() -> Map<String, Value> {
        let record = json!({
            "timestamp start": "2025-11-03_141530",
            "timestamp iso start": "2025-11-03T14:15:30.000000",
            "device": {"id": "17", "type": "MZI"},
            "measurement name": "InsertionLossSweep",
            "values": {"transmission": [1.0, 2.0]},
        });
        record.as_object().unwrap().clone()
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let record = base_record();
        let a = fingerprint(&record).unwrap();
        let b = fingerprint(&record).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_reflects_identity_fields_only() {
        let base = fingerprint(&base_record()).unwrap();

        let mut changed = base_record();
        changed[keys::DEVICE]["id"] = json!("18");
        assert_ne!(fingerprint(&changed).unwrap(), base);

        let mut changed = base_record();
        changed[keys::MEASUREMENT_NAME] = json!("ReadSpectrum");
        assert_ne!(fingerprint(&changed).unwrap(), base);

        let mut changed = base_record();
        changed.insert("chip".into(), json!({"name": "other"}));
        changed[keys::VALUES] = json!({"other channel": [9.9]});
        assert_eq!(fingerprint(&changed).unwrap(), base);
    }

    #[test]
    fn numeric_and_string_ids_differ() {
        let mut as_string = base_record();
        as_string[keys::DEVICE]["id"] = json!("3");
        let mut as_number = base_record();
        as_number[keys::DEVICE]["id"] = json!(3.0);
        assert_ne!(
            fingerprint(&as_string).unwrap(),
            fingerprint(&as_number).unwrap()
        );
    }

    #[test]
    fn timestamp_falls_back_through_candidates() {
        let mut record = base_record();
        record.remove(keys::TIMESTAMP_ISO_START);
        record.remove(keys::TIMESTAMP_START);
        record.insert(keys::TIMESTAMP_END.into(), json!("2025-11-03_150000"));
        let fp = fingerprint(&record).unwrap();
        assert!(fp.starts_with("2025-11-03_150000"));
    }

    #[test]
    fn name_falls_back_to_plain_name_key() {
        let mut record = base_record();
        record.remove(keys::MEASUREMENT_NAME);
        record.insert(keys::NAME.into(), json!("legacy import"));
        assert!(fingerprint(&record).unwrap().ends_with("legacy import"));
    }

    #[test]
    fn missing_identity_fields_are_reported() {
        let mut record = base_record();
        record[keys::DEVICE].as_object_mut().unwrap().remove("type");
        match fingerprint(&record) {
            Err(RecordError::MissingField { field }) => assert_eq!(field, "device.type"),
            other => panic!("expected missing device.type, got {other:?}"),
        }

        let mut record = base_record();
        record.remove(keys::TIMESTAMP_ISO_START);
        record.remove(keys::TIMESTAMP_START);
        record.remove("timestamp");
        assert!(matches!(
            fingerprint(&record),
            Err(RecordError::MissingField { .. })
        ));
    }
}
