use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use super::keys;

const ENABLE_LOGS: bool = true;
use crate::log_warn;

/// Default number of accesses between autosaves during a run.
pub const DEFAULT_AUTOSAVE_EVERY: u32 = 50;

/// An ordered string-keyed record that persists itself to its backing file
/// every N accesses.
///
/// Both `get` and `set` count toward the flush threshold. Reads counting as
/// writes is intentional, inherited behavior: downstream read-after-write
/// patterns double-count and thereby shorten the effective flush interval,
/// and measurement code in the field relies on that cadence.
///
/// Counter-triggered saves are best-effort: a failed write is logged and
/// swallowed, since it only risks losing intermediate progress. The explicit
/// [`save`](Self::save) called at commit time does propagate its error.
#[derive(Debug)]
pub struct AutosaveRecord {
    entries: Map<String, Value>,
    file_path: PathBuf,
    save_every: u32,
    access_count: u32,
    autosave: bool,
}

impl AutosaveRecord {
    pub fn new(file_path: PathBuf, save_every: u32) -> Self {
        Self {
            entries: Map::new(),
            file_path,
            save_every: save_every.max(1),
            access_count: 0,
            autosave: true,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Insert or replace a top-level entry. Counts one access.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.touched();
        self.entries.insert(key.into(), value);
    }

    /// Read a top-level entry. Counts one access.
    pub fn get(&mut self, key: &str) -> Option<&Value> {
        self.touched();
        self.entries.get(key)
    }

    /// Write one measurement-specific parameter into the
    /// `measurement settings` block. Counts one access.
    pub fn insert_setting(&mut self, key: impl Into<String>, value: Value) {
        self.touched();
        self.nested_block(keys::MEASUREMENT_SETTINGS)
            .insert(key.into(), value);
    }

    /// Write one measured channel into the `values` block. Counts one access.
    pub fn insert_values(&mut self, channel: impl Into<String>, samples: Vec<f64>) {
        self.touched();
        let samples = samples.into_iter().map(Value::from).collect();
        self.nested_block(keys::VALUES)
            .insert(channel.into(), Value::Array(samples));
    }

    /// Non-counting read of the full contents.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.entries.clone()
    }

    pub fn into_contents(self) -> Map<String, Value> {
        self.entries
    }

    /// Stop counter-triggered saves; called right before the final save and
    /// rename so the two cannot race.
    pub fn disable_autosave(&mut self) {
        self.autosave = false;
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave
    }

    /// Serialize the full record to the backing file as indented JSON,
    /// overwriting previous content. Works on a snapshot of the contents
    /// taken at call time.
    pub fn save(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.file_path, serialized)
            .with_context(|| format!("failed to write record to {}", self.file_path.display()))
    }

    /// Bumps the access counter and flushes once the threshold is reached.
    /// Runs before the triggering mutation lands, so the flushed file trails
    /// the live record by exactly that one access.
    fn touched(&mut self) {
        if !self.autosave {
            return;
        }
        self.access_count += 1;
        if self.access_count >= self.save_every {
            self.access_count = 0;
            if let Err(err) = self.save() {
                log_warn!(
                    "autosave of record {} failed (continuing): {err:#}",
                    self.file_path.display()
                );
            }
        }
    }

    fn nested_block(&mut self, key: &str) -> &mut Map<String, Value> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        entry.as_object_mut().expect("entry was just made an object")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_in(dir: &tempfile::TempDir, every: u32) -> AutosaveRecord {
        AutosaveRecord::new(dir.path().join("rec.json.part"), every)
    }

    #[test]
    fn three_accesses_trigger_exactly_one_save_at_threshold_three() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record_in(&dir, 3);

        rec.set("a", json!(1));
        rec.set("b", json!(2));
        assert!(!rec.file_path().exists(), "no save before the threshold");

        rec.set("c", json!(3));
        assert!(rec.file_path().exists(), "third access flushes");

        // flush runs before the triggering mutation lands
        let on_disk: Map<String, Value> =
            serde_json::from_str(&std::fs::read_to_string(rec.file_path()).unwrap()).unwrap();
        assert!(on_disk.contains_key("a") && on_disk.contains_key("b"));
        assert!(!on_disk.contains_key("c"));
    }

    #[test]
    fn reads_count_toward_the_flush_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record_in(&dir, 3);

        rec.set("a", json!(1));
        let _ = rec.get("a");
        let _ = rec.get("missing");
        assert!(rec.file_path().exists(), "two reads after one write flush at N=3");
    }

    #[test]
    fn disable_autosave_stops_counter_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record_in(&dir, 2);
        rec.disable_autosave();
        assert!(!rec.autosave_enabled());

        for i in 0..10 {
            rec.set(format!("k{i}"), json!(i));
        }
        assert!(!rec.file_path().exists());

        rec.save().unwrap();
        assert!(rec.file_path().exists());
    }

    #[test]
    fn nested_slots_land_in_their_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record_in(&dir, 100);

        rec.insert_setting("laser power dBm", json!(-6.0));
        rec.insert_values("transmission", vec![0.1, 0.2, 0.3]);

        let snap = rec.snapshot();
        assert_eq!(
            snap[keys::MEASUREMENT_SETTINGS]["laser power dBm"],
            json!(-6.0)
        );
        assert_eq!(snap[keys::VALUES]["transmission"], json!([0.1, 0.2, 0.3]));
    }

    #[test]
    fn save_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record_in(&dir, 100);
        rec.set("zulu", json!(1));
        rec.set("alpha", json!(2));
        rec.save().unwrap();

        let text = std::fs::read_to_string(rec.file_path()).unwrap();
        assert!(text.find("zulu").unwrap() < text.find("alpha").unwrap());
    }
}
