use thiserror::Error;

/// Validation failures raised while fingerprinting a record or admitting it
/// into the result collection. These are local to the admission step and
/// never abort the process.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A structurally required field is absent from the record.
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// The `values` block is present but holds no measured channels.
    #[error("measurement record needs to contain at least one values channel")]
    EmptyValues,

    /// A record with the same identity fingerprint is already indexed.
    #[error("duplicate measurement record (fingerprint {fingerprint})")]
    Duplicate { fingerprint: String },

    /// Removal was requested for a record that is not in the collection.
    #[error("record not present in collection (fingerprint {fingerprint})")]
    NotAdmitted { fingerprint: String },
}

impl RecordError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}
