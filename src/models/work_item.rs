use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::measurement::Measurement;

use super::Device;

/// A queued (device, measurement) pair awaiting execution.
///
/// Created by the selection surface, consumed exactly once by the sweep
/// worker; it leaves the queue only when its measurement completed.
pub struct WorkItem {
    pub device: Arc<Device>,
    pub measurement: Box<dyn Measurement>,
    created_at_us: i64,
}

impl WorkItem {
    pub fn new(device: Arc<Device>, measurement: Box<dyn Measurement>) -> Self {
        Self {
            device,
            measurement,
            created_at_us: Utc::now().timestamp_micros(),
        }
    }

    /// Queue-identity string: distinguishes two otherwise identical pairs
    /// enqueued at different times.
    pub fn queue_hash(&self) -> String {
        format!(
            "{}{}{}",
            self.device.short_str(),
            self.measurement.name_with_id(),
            self.created_at_us
        )
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<work item: {} on {}>",
            self.measurement.name_with_id(),
            self.device.short_str()
        )
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
