use std::f64::consts::PI;
use std::time::Duration;

use anyhow::anyhow;
use rand::Rng;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::Device;
use crate::record::AutosaveRecord;

use super::{Measurement, MeasurementError};

/// Software-only measurement generating normal-distributed samples.
///
/// Useful for exercising the sweep machinery without any instruments: the
/// sample count, distribution and total duration are settable, and an error
/// switch provokes a failure to test how the surrounding run handles it.
#[derive(Debug, Clone)]
pub struct DummyMeasurement {
    instance_id: String,
    pub points: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub total_duration: Duration,
    pub simulate_error: bool,
}

impl DummyMeasurement {
    pub fn new() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        Self {
            instance_id: id,
            points: 100,
            mean: 0.0,
            std_dev: 1.0,
            total_duration: Duration::from_secs(2),
            simulate_error: false,
        }
    }

    /// Variant that finishes immediately; the default two-second duration
    /// mimics a real acquisition and is too slow for unit tests.
    pub fn instant() -> Self {
        let mut meas = Self::new();
        meas.total_duration = Duration::ZERO;
        meas
    }

    pub fn failing() -> Self {
        let mut meas = Self::instant();
        meas.simulate_error = true;
        meas
    }
}

impl Default for DummyMeasurement {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement for DummyMeasurement {
    fn name(&self) -> &str {
        "DummyMeas"
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn measure(
        &mut self,
        _device: &Device,
        record: &mut AutosaveRecord,
        cancel: &CancellationToken,
    ) -> Result<(), MeasurementError> {
        record.insert_setting("number of points", json!(self.points));
        record.insert_setting("total measurement time", json!(self.total_duration.as_secs_f64()));
        record.insert_setting("mean", json!(self.mean));
        record.insert_setting("std. deviation", json!(self.std_dev));
        record.insert_setting("simulate measurement error", json!(self.simulate_error));

        if self.simulate_error {
            return Err(anyhow!("simulated measurement failure").into());
        }

        // pace the "acquisition" in short slices so cancellation stays responsive
        let mut remaining = self.total_duration;
        let slice = Duration::from_millis(50);
        while !remaining.is_zero() {
            if cancel.is_cancelled() {
                return Err(MeasurementError::Aborted);
            }
            let step = remaining.min(slice);
            std::thread::sleep(step);
            remaining -= step;
        }
        if cancel.is_cancelled() {
            return Err(MeasurementError::Aborted);
        }

        let mut rng = rand::thread_rng();
        let indices: Vec<f64> = (0..self.points).map(|i| i as f64).collect();
        let samples: Vec<f64> = (0..self.points)
            .map(|_| self.mean + self.std_dev * standard_normal(&mut rng))
            .collect();

        record.insert_values("point indices", indices);
        record.insert_values("point values", samples);
        Ok(())
    }
}

/// Box-Muller transform over two uniform draws.
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
