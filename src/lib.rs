//! labsweep: headless measurement-sweep runner for photonic chip lab
//! setups.
//!
//! A [`Sweep`] holds a queue of (device, measurement) work items; a
//! [`SweepRunner`] drains it on a background worker, writing one crash-safe
//! JSON record per item and admitting finished records into an in-memory,
//! fingerprint-deduplicated [`ResultCollection`]. Control surfaces hook in
//! through the injected ports ([`SweepObserver`], [`PauseFlag`], stage and
//! peak-search traits) instead of being called directly.

pub mod collection;
pub mod error;
pub mod measurement;
pub mod models;
pub mod provenance;
pub mod record;
pub mod settings;
pub mod sweep;
pub mod utils;

pub use collection::{AdmittedRecord, ResultCollection};
pub use error::RecordError;
pub use measurement::{DummyMeasurement, InstrumentSnapshot, Measurement, MeasurementError};
pub use models::{Chip, Device, WorkItem};
pub use provenance::Provenance;
pub use record::{fingerprint, AutosaveRecord};
pub use settings::{ExecutionControl, SettingsStore, SweepSettings};
pub use sweep::{
    AttemptOutcome, HaltReason, NullObserver, PauseFlag, PeakSearcher, RunPhase, StageMover,
    Sweep, SweepObserver, SweepOutcome, SweepRunner,
};
