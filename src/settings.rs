use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::record::DEFAULT_AUTOSAVE_EVERY;

/// Execution-control flags read by the sweep worker at iteration
/// boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionControl {
    /// Halt the loop after every completed device instead of continuing.
    pub pause_after_each_device: bool,
    /// Drive the stage to each device before measuring.
    pub auto_move_stages: bool,
    /// Run the automatic peak search after moving, before measuring.
    pub execute_search_for_peak: bool,
    /// Idle time between consecutive successful measurements.
    pub inter_measurement_wait_secs: f64,
}

impl Default for ExecutionControl {
    fn default() -> Self {
        Self {
            pause_after_each_device: false,
            auto_move_stages: false,
            execute_search_for_peak: false,
            inter_measurement_wait_secs: 0.0,
        }
    }
}

/// Per-run configuration: where records land and how often they autosave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    pub output_dir: PathBuf,
    pub autosave_every: u32,
    pub execution: ExecutionControl,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            autosave_every: DEFAULT_AUTOSAVE_EVERY,
            execution: ExecutionControl::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join("laboratory_measurements"),
        None => PathBuf::from("laboratory_measurements"),
    }
}

/// JSON-backed store for the user's sweep defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<SweepSettings>,
}

impl SettingsStore {
    /// Load from `path`, falling back to defaults when the file is absent
    /// or unreadable as settings.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            SweepSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> SweepSettings {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, apply: impl FnOnce(&mut SweepSettings)) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        apply(&mut guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &SweepSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_updates_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update(|s| {
                s.autosave_every = 7;
                s.execution.pause_after_each_device = true;
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        let settings = reloaded.get();
        assert_eq!(settings.autosave_every, 7);
        assert!(settings.execution.pause_after_each_device);
    }

    #[test]
    fn unreadable_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get().autosave_every, DEFAULT_AUTOSAVE_EVERY);
    }
}
