//! In-memory collection of finished measurement records.
//!
//! The collection is the gatekeeper between the sweep worker and anything
//! displaying results: a record only enters after its shape is validated
//! and its fingerprint is proven unique. Mutation happens on the worker
//! thread; display surfaces read owned snapshots, so they can never observe
//! a half-admitted record.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::error::RecordError;
use crate::record::{fingerprint, keys, resolve_iso_timestamp, resolve_name, resolve_timestamp};

/// A finalized record accepted into the collection, with its identity
/// fields resolved once at admission time.
#[derive(Debug, Clone)]
pub struct AdmittedRecord {
    pub data: Map<String, Value>,
    pub file_path: PathBuf,
    pub fingerprint: String,
    pub display_name: String,
    pub timestamp: String,
    pub iso_timestamp: Option<String>,
}

#[derive(Default)]
struct Inner {
    records: Vec<Arc<AdmittedRecord>>,
    index: HashSet<String>,
}

/// Ordered list of admitted records plus the fingerprint index that keeps
/// them duplicate-free.
#[derive(Default)]
pub struct ResultCollection {
    inner: Mutex<Inner>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `data` and admit it. All-or-nothing: any failure leaves the
    /// collection untouched.
    ///
    /// Checks, in order: `chip` present; `device` present with `id` and
    /// `type`; a resolvable timestamp; a resolvable name; a non-empty
    /// `values` mapping; a fingerprint not yet indexed.
    pub fn admit(
        &self,
        data: Map<String, Value>,
        file_path: PathBuf,
    ) -> Result<Arc<AdmittedRecord>, RecordError> {
        if !data.contains_key(keys::CHIP) {
            return Err(RecordError::missing(keys::CHIP));
        }
        let device = data
            .get(keys::DEVICE)
            .and_then(Value::as_object)
            .ok_or_else(|| RecordError::missing(keys::DEVICE))?;
        for field in [keys::DEVICE_ID, keys::DEVICE_TYPE] {
            if !device.contains_key(field) {
                return Err(RecordError::missing(format!("device.{field}")));
            }
        }

        let timestamp = resolve_timestamp(&data)?;
        let display_name = resolve_name(&data)?;
        let iso_timestamp = resolve_iso_timestamp(&data);

        match data.get(keys::VALUES) {
            None => return Err(RecordError::missing(keys::VALUES)),
            Some(Value::Object(channels)) if !channels.is_empty() => {}
            Some(_) => return Err(RecordError::EmptyValues),
        }

        let fp = fingerprint(&data)?;

        let record = Arc::new(AdmittedRecord {
            data,
            file_path,
            fingerprint: fp.clone(),
            display_name,
            timestamp,
            iso_timestamp,
        });

        let mut inner = self.inner.lock().expect("result collection lock poisoned");
        if inner.index.contains(&fp) {
            return Err(RecordError::Duplicate { fingerprint: fp });
        }
        inner.index.insert(fp);
        inner.records.push(record.clone());
        Ok(record)
    }

    /// Remove a previously admitted record from both the index and the list.
    pub fn remove(&self, record: &AdmittedRecord) -> Result<(), RecordError> {
        let fp = fingerprint(&record.data)?;
        let mut inner = self.inner.lock().expect("result collection lock poisoned");
        if !inner.index.remove(&fp) {
            return Err(RecordError::NotAdmitted { fingerprint: fp });
        }
        inner.records.retain(|r| r.fingerprint != fp);
        Ok(())
    }

    /// Owned snapshot of the admitted records, in admission order.
    pub fn snapshot(&self) -> Vec<Arc<AdmittedRecord>> {
        self.inner
            .lock()
            .expect("result collection lock poisoned")
            .records
            .clone()
    }

    pub fn contains_fingerprint(&self, fp: &str) -> bool {
        self.inner
            .lock()
            .expect("result collection lock poisoned")
            .index
            .contains(fp)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("result collection lock poisoned")
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_record(device_id: &str, ts: &str) -> Map<String, Value> {
        json!({
            "chip": {"name": "TestChip", "description file path": ""},
            "device": {"id": device_id, "type": "MZI"},
            "timestamp start": ts,
            "measurement name": "DummyMeas",
            "values": {"point values": [1.0, 2.0, 3.0]},
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn admits_valid_record() {
        let collection = ResultCollection::new();
        let admitted = collection
            .admit(valid_record("1", "2025-11-03_120000"), PathBuf::from("/tmp/a.json"))
            .unwrap();
        assert_eq!(admitted.display_name, "DummyMeas");
        assert_eq!(admitted.timestamp, "2025-11-03_120000");
        assert_eq!(collection.len(), 1);
        assert!(collection.contains_fingerprint(&admitted.fingerprint));
    }

    #[test]
    fn rejects_duplicate_fingerprint_without_mutation() {
        let collection = ResultCollection::new();
        collection
            .admit(valid_record("1", "2025-11-03_120000"), PathBuf::from("/tmp/a.json"))
            .unwrap();

        let err = collection
            .admit(valid_record("1", "2025-11-03_120000"), PathBuf::from("/tmp/b.json"))
            .unwrap_err();
        assert!(matches!(err, RecordError::Duplicate { .. }));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn rejects_empty_values() {
        let collection = ResultCollection::new();
        let mut record = valid_record("1", "2025-11-03_120000");
        record[keys::VALUES] = json!({});
        let err = collection
            .admit(record, PathBuf::from("/tmp/a.json"))
            .unwrap_err();
        assert!(matches!(err, RecordError::EmptyValues));
        assert!(collection.is_empty());
    }

    #[test]
    fn reports_which_device_field_is_missing() {
        let collection = ResultCollection::new();
        let mut record = valid_record("1", "2025-11-03_120000");
        record[keys::DEVICE].as_object_mut().unwrap().remove("id");
        match collection.admit(record, PathBuf::from("/tmp/a.json")) {
            Err(RecordError::MissingField { field }) => assert_eq!(field, "device.id"),
            other => panic!("expected missing device.id, got {other:?}"),
        }
    }

    #[test]
    fn requires_chip_and_device() {
        let collection = ResultCollection::new();
        let mut record = valid_record("1", "2025-11-03_120000");
        record.remove(keys::CHIP);
        assert!(matches!(
            collection.admit(record, PathBuf::from("/tmp/a.json")),
            Err(RecordError::MissingField { field }) if field == "chip"
        ));

        let mut record = valid_record("1", "2025-11-03_120000");
        record.remove(keys::DEVICE);
        assert!(matches!(
            collection.admit(record, PathBuf::from("/tmp/a.json")),
            Err(RecordError::MissingField { field }) if field == "device"
        ));
    }

    #[test]
    fn remove_drops_record_and_index_entry() {
        let collection = ResultCollection::new();
        let admitted = collection
            .admit(valid_record("1", "2025-11-03_120000"), PathBuf::from("/tmp/a.json"))
            .unwrap();

        collection.remove(&admitted).unwrap();
        assert!(collection.is_empty());
        assert!(!collection.contains_fingerprint(&admitted.fingerprint));

        let err = collection.remove(&admitted).unwrap_err();
        assert!(matches!(err, RecordError::NotAdmitted { .. }));
    }

    #[test]
    fn same_pair_with_distinct_timestamps_coexists() {
        let collection = ResultCollection::new();
        collection
            .admit(valid_record("1", "2025-11-03_120000"), PathBuf::from("/tmp/a.json"))
            .unwrap();
        collection
            .admit(valid_record("1", "2025-11-03_120001"), PathBuf::from("/tmp/b.json"))
            .unwrap();
        assert_eq!(collection.len(), 2);
    }
}
