use serde::{Deserialize, Serialize};

/// Phase of the sweep worker, published for display surfaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunPhase {
    Idle,
    Preparing,
    Executing,
    Finalizing,
    Halted,
}

impl Default for RunPhase {
    fn default() -> Self {
        RunPhase::Idle
    }
}

/// Why the worker stopped iterating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HaltReason {
    /// Every queued work item completed.
    QueueDrained,
    /// The pause-after-each-device flag was set; resumable.
    PauseAfterDevice,
    /// The control surface's pause flag was set at an iteration boundary.
    PauseRequested,
    /// A measurement failed; the loop stays halted until a human clears
    /// the pause state and restarts.
    MeasurementFailed,
    /// The run was cancelled.
    Aborted,
}

/// How a single measurement attempt ended.
///
/// Distinct from the record's `finished` flag, which only means the attempt
/// is over and the record will not change again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttemptOutcome {
    Completed,
    Failed,
    Aborted,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Completed => "completed",
            AttemptOutcome::Failed => "failed",
            AttemptOutcome::Aborted => "aborted",
        }
    }

    /// Suffix the record file is renamed to at commit.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            AttemptOutcome::Completed => ".json",
            AttemptOutcome::Failed => "_error.json",
            AttemptOutcome::Aborted => "_abort.json",
        }
    }
}

/// Summary returned by the worker when the loop halts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub halt_reason: HaltReason,
    pub completed: usize,
    pub failed: usize,
    pub aborted: usize,
}
