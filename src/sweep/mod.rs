//! The measurement sweep: work-item queue, per-item record production, and
//! the background worker that drains the queue.

mod controller;
mod loop_worker;
mod ports;
mod state;

pub use controller::SweepRunner;
pub use ports::{NullObserver, PauseFlag, PeakSearcher, StageMover, SweepObserver};
pub use state::{AttemptOutcome, HaltReason, RunPhase, SweepOutcome};

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::collection::ResultCollection;
use crate::models::{Chip, Device, WorkItem};
use crate::provenance::Provenance;
use crate::settings::SweepSettings;
use crate::utils::filenames::{make_filename_compliant, uniquify_file_stem};

/// One experiment: the chip under test, the work-item queue, the collection
/// of finished records, and the injected control-surface ports.
///
/// Construct with [`Sweep::new`], attach ports with the `with_*` builders,
/// then wrap in an [`Arc`] and hand to a [`SweepRunner`]. The worker owns
/// the queue and the in-flight record exclusively while a run is active;
/// other threads interact only through the pause flag, the observer, and
/// collection snapshots.
pub struct Sweep {
    chip: Chip,
    settings: SweepSettings,
    provenance: Provenance,
    queue: Mutex<VecDeque<WorkItem>>,
    collection: ResultCollection,
    observer: Arc<dyn SweepObserver>,
    pause: PauseFlag,
    stage_mover: Option<Arc<dyn StageMover>>,
    peak_searcher: Option<Arc<dyn PeakSearcher>>,
    last_executed: Mutex<Option<(Arc<Device>, String)>>,
}

impl Sweep {
    pub fn new(chip: Chip, settings: SweepSettings) -> Self {
        Self {
            chip,
            settings,
            provenance: Provenance::collect(),
            queue: Mutex::new(VecDeque::new()),
            collection: ResultCollection::new(),
            observer: Arc::new(NullObserver),
            pause: PauseFlag::new(),
            stage_mover: None,
            peak_searcher: None,
            last_executed: Mutex::new(None),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SweepObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_pause_flag(mut self, pause: PauseFlag) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_stage_mover(mut self, mover: Arc<dyn StageMover>) -> Self {
        self.stage_mover = Some(mover);
        self
    }

    pub fn with_peak_searcher(mut self, searcher: Arc<dyn PeakSearcher>) -> Self {
        self.peak_searcher = Some(searcher);
        self
    }

    pub fn chip(&self) -> &Chip {
        &self.chip
    }

    pub fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    pub fn collection(&self) -> &ResultCollection {
        &self.collection
    }

    pub fn pause_flag(&self) -> PauseFlag {
        self.pause.clone()
    }

    pub(crate) fn observer(&self) -> &dyn SweepObserver {
        self.observer.as_ref()
    }

    pub(crate) fn stage_mover(&self) -> Option<&Arc<dyn StageMover>> {
        self.stage_mover.as_ref()
    }

    pub(crate) fn peak_searcher(&self) -> Option<&Arc<dyn PeakSearcher>> {
        self.peak_searcher.as_ref()
    }

    pub(crate) fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Append a work item to the end of the queue.
    pub fn queue_work_item(&self, item: WorkItem) {
        self.queue.lock().expect("work queue lock poisoned").push_back(item);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().expect("work queue lock poisoned").len()
    }

    /// Take the head work item out of the queue. The worker puts it back at
    /// the front when the attempt fails or aborts, so a failed item stays
    /// first in line for a retry.
    pub(crate) fn take_next_work_item(&self) -> Option<WorkItem> {
        self.queue.lock().expect("work queue lock poisoned").pop_front()
    }

    pub(crate) fn requeue_front(&self, item: WorkItem) {
        self.queue.lock().expect("work queue lock poisoned").push_front(item);
    }

    /// The (device, measurement) pair of the most recent attempt, whatever
    /// its outcome; backs the manual redo action.
    pub fn last_executed(&self) -> Option<(Arc<Device>, String)> {
        self.last_executed
            .lock()
            .expect("last-executed lock poisoned")
            .clone()
    }

    pub(crate) fn set_last_executed(&self, device: Arc<Device>, measurement_name_id: String) {
        *self
            .last_executed
            .lock()
            .expect("last-executed lock poisoned") = Some((device, measurement_name_id));
    }

    /// Output file stem for one work item, uniquified against files already
    /// on disk. Extensionless: the worker appends `.json.part` while
    /// writing and the outcome suffix at commit.
    pub(crate) fn record_file_stem(&self, device: &Device, meas_name: &str, ts: &str) -> PathBuf {
        let raw = format!(
            "{}_id{}_{}_{}_{}",
            self.chip.name, device.id, device.kind, meas_name, ts
        );
        let name = make_filename_compliant(&raw);
        uniquify_file_stem(&self.settings.output_dir.join(name))
    }
}
