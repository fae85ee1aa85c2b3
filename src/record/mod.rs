//! Measurement record handling: the autosaving record that backs a running
//! measurement, the key layout of the persisted JSON, and the identity
//! fingerprint used to deduplicate finished records.

mod autosave;
mod fingerprint;

pub use autosave::{AutosaveRecord, DEFAULT_AUTOSAVE_EVERY};
pub use fingerprint::{fingerprint, resolve_iso_timestamp, resolve_name, resolve_timestamp};

/// Timestamp format used for file names and the plain record timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// ISO-8601 variant stored alongside the start timestamp.
pub const TIMESTAMP_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Keys of the persisted record, in the order a fresh record populates them.
pub mod keys {
    pub const SOFTWARE: &str = "software";
    pub const EXPERIMENT_SETTINGS: &str = "experiment settings";
    pub const CHIP: &str = "chip";
    pub const DEVICE: &str = "device";
    pub const TIMESTAMP_START: &str = "timestamp start";
    pub const TIMESTAMP_ISO_START: &str = "timestamp iso start";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TIMESTAMP_END: &str = "timestamp end";
    pub const MEASUREMENT_NAME: &str = "measurement name";
    pub const MEASUREMENT_NAME_AND_ID: &str = "measurement name and id";
    pub const INSTRUMENTS: &str = "instruments";
    pub const MEASUREMENT_SETTINGS: &str = "measurement settings";
    pub const VALUES: &str = "values";
    pub const ERROR: &str = "error";
    pub const FINISHED: &str = "finished";
    pub const SEARCH_FOR_PEAK: &str = "search for peak";
    pub const OUTCOME: &str = "outcome";

    /// Alternate name key accepted when admitting externally produced records.
    pub const NAME: &str = "name";

    pub const DEVICE_ID: &str = "id";
    pub const DEVICE_TYPE: &str = "type";
}
