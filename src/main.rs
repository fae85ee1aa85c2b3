//! Demo sweep: runs the software-only dummy measurement over a couple of
//! devices and reports where the records landed.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use serde_json::json;

use labsweep::{
    Chip, Device, DummyMeasurement, Sweep, SweepObserver, SweepOutcome, SweepRunner,
    SweepSettings, WorkItem,
};

struct LogObserver;

impl SweepObserver for LogObserver {
    fn results_updated(&self) {
        info!("result collection updated");
    }

    fn measurement_failed(&self, message: &str) {
        log::error!("{message}");
    }

    fn sweep_finished(&self) {
        info!("all measurements finished");
    }

    fn run_halted(&self, outcome: &SweepOutcome) {
        info!(
            "worker halted ({:?}): {} completed, {} failed, {} aborted",
            outcome.halt_reason, outcome.completed, outcome.failed, outcome.aborted
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("labsweep demo sweep starting up...");

    let settings = SweepSettings::default();
    info!("records go to {}", settings.output_dir.display());

    let chip = Chip::new("DemoChip", "");
    let sweep = Arc::new(Sweep::new(chip, settings).with_observer(Arc::new(LogObserver)));

    for (id, kind) in [("1", "MZI"), ("2", "RingResonator")] {
        let device = Arc::new(
            Device::new(id, kind).with_parameter("x position", json!(1250.0 + 40.0 * id.parse::<f64>()?)),
        );
        let mut measurement = DummyMeasurement::new();
        measurement.points = 200;
        sweep.queue_work_item(WorkItem::new(device, Box::new(measurement)));
    }

    let mut runner = SweepRunner::new();
    runner.start(sweep.clone()).await?;
    let outcome = runner
        .join()
        .await?
        .expect("runner was started, so a worker must have been active");

    println!(
        "sweep halted ({:?}): {} record(s) admitted",
        outcome.halt_reason,
        sweep.collection().len()
    );
    for record in sweep.collection().snapshot() {
        println!("  {} -> {}", record.display_name, record.file_path.display());
    }
    Ok(())
}
