//! Capability ports injected into the sweep worker.
//!
//! The worker never talks to a window, a table or a dialog directly; any
//! control surface implements these traits and is handed in at
//! construction. Every method has a no-op default so embedders implement
//! only what they display.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::models::Device;
use crate::sweep::SweepOutcome;

/// Notifications from the sweep worker to its control surface.
pub trait SweepObserver: Send + Sync {
    /// The result collection changed; refresh any view of it.
    fn results_updated(&self) {}

    /// Live-updating plot buffers should be dropped; the measurement that
    /// fed them is over.
    fn clear_live_plots(&self) {}

    /// A measurement failed. May block (modal dialog); the worker waits.
    fn measurement_failed(&self, _message: &str) {}

    /// All queued work items completed.
    fn sweep_finished(&self) {}

    /// The worker halted, for whatever reason.
    fn run_halted(&self, _outcome: &SweepOutcome) {}
}

/// Observer that ignores everything; default for headless embedding.
pub struct NullObserver;

impl SweepObserver for NullObserver {}

/// Settable pause bit shared between the control surface and the worker.
/// The worker reads it at iteration boundaries and sets it itself when a
/// measurement fails.
#[derive(Clone, Default)]
pub struct PauseFlag(Arc<AtomicBool>);

impl PauseFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, paused: bool) {
        self.0.store(paused, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives the positioning stage to a device before measuring.
pub trait StageMover: Send + Sync {
    fn move_to_device(&self, device: &Device) -> anyhow::Result<()>;
}

/// Automatic fiber-to-device alignment, run after stage movement.
pub trait PeakSearcher: Send + Sync {
    /// Re-read the search parameters from their settings file.
    fn reload_parameters(&self) -> anyhow::Result<()>;

    /// Run the search; the returned block is stored in the record.
    fn search_for_peak(&self) -> anyhow::Result<Value>;
}
