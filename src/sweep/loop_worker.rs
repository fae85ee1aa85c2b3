use std::any::Any;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Local;
use serde_json::{json, Map, Value};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::measurement::MeasurementError;
use crate::models::{Device, WorkItem};
use crate::record::{keys, AutosaveRecord, TIMESTAMP_FORMAT, TIMESTAMP_ISO_FORMAT};

use super::state::{AttemptOutcome, HaltReason, RunPhase, SweepOutcome};
use super::Sweep;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Drains the work-item queue one item at a time until it empties, a pause
/// is requested, a measurement fails, or the run is cancelled.
///
/// Every attempt, successful or not, leaves a committed record file behind;
/// failed and aborted items stay at the head of the queue for a retry.
pub(crate) async fn sweep_loop(
    sweep: Arc<Sweep>,
    cancel: CancellationToken,
    phase_tx: watch::Sender<RunPhase>,
) -> SweepOutcome {
    let mut completed = 0usize;
    let mut failed = 0usize;
    let mut aborted = 0usize;

    log_info!("sweep run starting: {} work item(s) queued", sweep.queue_len());

    let exctrl = sweep.settings().execution.clone();

    if let Err(err) = fs::create_dir_all(&sweep.settings().output_dir) {
        log_error!(
            "cannot create output directory {}: {err}",
            sweep.settings().output_dir.display()
        );
        sweep.pause_flag().set(true);
        let _ = phase_tx.send(RunPhase::Halted);
        return SweepOutcome {
            halt_reason: HaltReason::MeasurementFailed,
            completed,
            failed,
            aborted,
        };
    }

    let halt_reason = 'run: loop {
        // iteration boundary: cancellation and the surface's pause flag
        if cancel.is_cancelled() {
            break 'run HaltReason::Aborted;
        }
        if sweep.pause_flag().is_set() {
            log_info!("pause flag set; sweep loop halting");
            break 'run HaltReason::PauseRequested;
        }

        let Some(item) = sweep.take_next_work_item() else {
            break 'run HaltReason::QueueDrained;
        };

        let _ = phase_tx.send(RunPhase::Preparing);
        let device = item.device.clone();
        let meas_name = item.measurement.name().to_string();
        let meas_name_id = item.measurement.name_with_id();
        log_info!("preparing {} on {}", meas_name_id, device.short_str());

        let now = Local::now();
        let ts = now.format(TIMESTAMP_FORMAT).to_string();
        let ts_iso = now.format(TIMESTAMP_ISO_FORMAT).to_string();

        let stem = sweep.record_file_stem(&device, &meas_name, &ts);
        let part_path = PathBuf::from(format!("{}.json.part", stem.display()));

        let mut record = AutosaveRecord::new(part_path, sweep.settings().autosave_every);
        populate_fresh_record(&mut record, &sweep, &device, &item, &ts, &ts_iso);

        // optional stage movement and alignment; their failures are treated
        // like measurement failures
        let mut exec_result: Result<(), MeasurementError> = Ok(());
        if exctrl.auto_move_stages {
            exec_result = match sweep.stage_mover() {
                Some(mover) => mover.move_to_device(&device).map_err(MeasurementError::from),
                None => Err(MeasurementError::Failed(anyhow!(
                    "automatic stage movement enabled but no stage mover attached"
                ))),
            };
            if exec_result.is_ok() {
                log_info!("automatically moved to {}", device.short_str());
            }
        }
        if exec_result.is_ok() {
            if exctrl.execute_search_for_peak {
                exec_result = match sweep.peak_searcher() {
                    Some(searcher) => searcher
                        .reload_parameters()
                        .and_then(|_| searcher.search_for_peak())
                        .map(|found| {
                            record.set(keys::SEARCH_FOR_PEAK, found);
                            log_info!("search for peak done");
                        })
                        .map_err(MeasurementError::from),
                    None => Err(MeasurementError::Failed(anyhow!(
                        "peak search enabled but no peak searcher attached"
                    ))),
                };
            } else {
                record.set(keys::SEARCH_FOR_PEAK, Value::Null);
            }
        }

        if exec_result.is_ok() && cancel.is_cancelled() {
            exec_result = Err(MeasurementError::Aborted);
        }

        // hand the record to the opaque measurement routine on a blocking
        // worker; the routine may block on instrument I/O for unbounded time
        let (item, mut record) = if exec_result.is_ok() {
            let _ = phase_tx.send(RunPhase::Executing);
            log_info!("executing measurement {} on {}", meas_name_id, device.short_str());

            let cancel_meas = cancel.clone();
            let mut item = item;
            let mut record = record;
            let join = tokio::task::spawn_blocking(move || {
                // third-party measurement code: a panic must surface as an
                // ordinary failure, not take the worker down
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let device = item.device.clone();
                    item.measurement.measure(&device, &mut record, &cancel_meas)
                }));
                let result = match result {
                    Ok(inner) => inner,
                    Err(panic) => Err(MeasurementError::Failed(anyhow!(
                        "measurement panicked: {}",
                        panic_message(&panic)
                    ))),
                };
                (item, record, result)
            })
            .await;

            match join {
                Ok((item, record, result)) => {
                    exec_result = result;
                    (item, record)
                }
                Err(err) => {
                    // the blocking task vanished along with the record;
                    // nothing left to finalize
                    log_error!("measurement worker vanished: {err}");
                    sweep.pause_flag().set(true);
                    break 'run HaltReason::MeasurementFailed;
                }
            }
        } else {
            (item, record)
        };

        if exec_result.is_ok() && cancel.is_cancelled() {
            exec_result = Err(MeasurementError::Aborted);
        }

        let outcome = match &exec_result {
            Ok(()) => AttemptOutcome::Completed,
            Err(MeasurementError::Aborted) => AttemptOutcome::Aborted,
            Err(MeasurementError::Failed(_)) => AttemptOutcome::Failed,
        };

        if let Err(err) = &exec_result {
            record.set(keys::ERROR, error_block(err));
            match err {
                MeasurementError::Failed(cause) => {
                    sweep.pause_flag().set(true);
                    let msg = format!("Error occurred during measurement: {cause:#}");
                    log_error!("{msg}");
                    sweep.observer().measurement_failed(&msg);
                }
                MeasurementError::Aborted => {
                    log_info!("measurement {} aborted by user", meas_name_id);
                }
            }
        }

        // finalization runs for every outcome: the attempt is over and its
        // record must land on disk under a committed name
        let _ = phase_tx.send(RunPhase::Finalizing);
        sweep.observer().clear_live_plots();
        record.set(
            keys::INSTRUMENTS,
            Value::Object(item.measurement.instrument_snapshot()),
        );
        let ts_end = Local::now().format(TIMESTAMP_FORMAT).to_string();
        record.set(keys::TIMESTAMP_END, Value::String(ts_end.clone()));
        record.set(keys::TIMESTAMP, Value::String(ts_end));
        record.set(keys::FINISHED, Value::Bool(true));
        record.set(keys::OUTCOME, Value::String(outcome.as_str().into()));

        record.disable_autosave();
        if let Err(err) = record.save() {
            log_error!(
                "final save of {} failed: {err:#}",
                record.file_path().display()
            );
        }
        let final_path = PathBuf::from(format!("{}{}", stem.display(), outcome.file_suffix()));
        if let Err(err) = fs::rename(record.file_path(), &final_path) {
            log_error!(
                "could not commit record file {}: {err}",
                record.file_path().display()
            );
        }
        log_info!(
            "saved data of measurement {} to {}",
            meas_name_id,
            final_path.display()
        );
        sweep.set_last_executed(device.clone(), meas_name_id.clone());

        match exec_result {
            Ok(()) => {
                completed += 1;
                // a duplicate or malformed record here is a defect upstream,
                // not a reason to halt the run
                if let Err(err) = sweep.collection().admit(record.into_contents(), final_path) {
                    log_error!("finished record was rejected: {err}");
                }
                sweep.observer().results_updated();
            }
            Err(MeasurementError::Aborted) => {
                aborted += 1;
                sweep.requeue_front(item);
                sweep.observer().results_updated();
                break 'run HaltReason::Aborted;
            }
            Err(MeasurementError::Failed(_)) => {
                failed += 1;
                sweep.requeue_front(item);
                sweep.observer().results_updated();
                break 'run HaltReason::MeasurementFailed;
            }
        }

        if exctrl.pause_after_each_device {
            log_info!("pause-after-device set; sweep loop halting");
            break 'run HaltReason::PauseAfterDevice;
        }

        if sweep.queue_len() == 0 {
            sweep.observer().sweep_finished();
            log_info!("sweep and hereby all measurements finished");
            break 'run HaltReason::QueueDrained;
        }

        if exctrl.inter_measurement_wait_secs > 0.0 {
            log_info!(
                "waiting {:.0}s before continuing",
                exctrl.inter_measurement_wait_secs
            );
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs_f64(exctrl.inter_measurement_wait_secs)) => {}
                _ = cancel.cancelled() => break 'run HaltReason::Aborted,
            }
        }
    };

    let _ = phase_tx.send(match halt_reason {
        HaltReason::QueueDrained => RunPhase::Idle,
        _ => RunPhase::Halted,
    });
    let outcome = SweepOutcome {
        halt_reason,
        completed,
        failed,
        aborted,
    };
    log_info!(
        "sweep loop halted ({:?}): {} completed, {} failed, {} aborted",
        outcome.halt_reason,
        outcome.completed,
        outcome.failed,
        outcome.aborted
    );
    outcome
}

/// Populate all static and pre-measurement fields of a fresh record, in the
/// order they appear in the persisted file.
fn populate_fresh_record(
    record: &mut AutosaveRecord,
    sweep: &Sweep,
    device: &Device,
    item: &WorkItem,
    ts: &str,
    ts_iso: &str,
) {
    let exctrl = &sweep.settings().execution;

    record.set(keys::SOFTWARE, sweep.provenance().record_block());
    record.set(
        keys::EXPERIMENT_SETTINGS,
        json!({
            "pause after each device": exctrl.pause_after_each_device,
            "auto move stages to device": exctrl.auto_move_stages,
            "execute search for peak": exctrl.execute_search_for_peak,
        }),
    );
    record.set(keys::CHIP, sweep.chip().record_block());
    record.set(keys::DEVICE, device.record_block());

    record.set(keys::TIMESTAMP_START, Value::String(ts.into()));
    record.set(keys::TIMESTAMP_ISO_START, Value::String(ts_iso.into()));
    record.set(keys::TIMESTAMP, Value::String(ts.into()));

    record.set(
        keys::MEASUREMENT_NAME,
        Value::String(item.measurement.name().into()),
    );
    record.set(
        keys::MEASUREMENT_NAME_AND_ID,
        Value::String(item.measurement.name_with_id()),
    );
    record.set(
        keys::INSTRUMENTS,
        Value::Object(item.measurement.instrument_snapshot()),
    );
    record.set(keys::MEASUREMENT_SETTINGS, Value::Object(Map::new()));
    record.set(keys::VALUES, Value::Object(Map::new()));
    record.set(keys::ERROR, Value::Object(Map::new()));
    record.set(keys::FINISHED, Value::Bool(false));
}

/// The `error` block written into a record that did not complete.
fn error_block(err: &MeasurementError) -> Value {
    match err {
        MeasurementError::Aborted => json!({
            "type": err.kind(),
            "desc": "Measurement aborted by user.",
            "traceback": "",
        }),
        MeasurementError::Failed(cause) => json!({
            "type": err.kind(),
            "desc": format!("{cause}"),
            "traceback": format!("{cause:?}"),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
