//! The contract between the sweep runner and measurement routines.
//!
//! Measurement implementations are opaque to the runner: they receive the
//! device and the live record, fill `measurement settings` and `values`, and
//! may fail in any way they like. The runner only distinguishes ordinary
//! failure from cancellation.

mod dummy;

pub use dummy::DummyMeasurement;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::Device;
use crate::record::AutosaveRecord;

/// Snapshot of the settings of all instruments a measurement has connected,
/// keyed by instrument role.
pub type InstrumentSnapshot = Map<String, Value>;

/// How a measurement attempt ended when it did not complete.
#[derive(Debug, Error)]
pub enum MeasurementError {
    /// Ordinary failure inside the routine (instrument timeout, bad
    /// parameters, panic, ...). Captured into the record's error block;
    /// the work item stays queued for a manual retry.
    #[error("measurement failed: {0:#}")]
    Failed(#[from] anyhow::Error),

    /// The user cancelled the run. Captured distinctly, without a trace.
    #[error("measurement aborted by user")]
    Aborted,
}

impl MeasurementError {
    /// The `error.type` marker written into the record.
    pub fn kind(&self) -> &'static str {
        match self {
            MeasurementError::Failed(_) => "Error",
            MeasurementError::Aborted => "Abort",
        }
    }
}

/// A measurement routine that can be queued against devices.
///
/// `measure` runs on a blocking worker thread and may take unbounded real
/// time waiting on instrument I/O. Implementations should poll `cancel` at
/// their own safe points and return [`MeasurementError::Aborted`] when it
/// fires; the runner cannot interrupt a routine that never checks.
pub trait Measurement: Send {
    /// Routine name as it appears in records and file names.
    fn name(&self) -> &str;

    /// Short id distinguishing this instance from other configured copies
    /// of the same routine.
    fn instance_id(&self) -> &str;

    fn name_with_id(&self) -> String {
        format!("{} (id {})", self.name(), self.instance_id())
    }

    /// Settings of all connected instruments; captured into the record once
    /// before and once after the measurement.
    fn instrument_snapshot(&self) -> InstrumentSnapshot {
        InstrumentSnapshot::new()
    }

    /// Run the measurement on `device`, writing results into `record`'s
    /// `measurement settings` and `values` slots.
    fn measure(
        &mut self,
        device: &Device,
        record: &mut AutosaveRecord,
        cancel: &CancellationToken,
    ) -> Result<(), MeasurementError>;
}
