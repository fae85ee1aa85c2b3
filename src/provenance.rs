use serde::Serialize;
use serde_json::{json, Value};

/// Static provenance written into every record's `software` block: which
/// build produced the data, and on which machine.
#[derive(Debug, Clone, Serialize)]
pub struct Provenance {
    pub name: String,
    pub version: String,
    pub source_revision: String,
    pub computer: String,
}

impl Provenance {
    /// Capture once at experiment construction; the values cannot change
    /// during a run.
    pub fn collect() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            source_revision: option_env!("LABSWEEP_GIT_REV").unwrap_or("unknown").to_string(),
            computer: sysinfo::System::host_name().unwrap_or_else(|| "unknown-host".to_string()),
        }
    }

    /// The `software` block of a measurement record.
    pub fn record_block(&self) -> Value {
        json!({
            "name": self.name,
            "version": self.version,
            "git rev": self.source_revision,
            "computer": self.computer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_block_carries_package_identity() {
        let block = Provenance::collect().record_block();
        assert_eq!(block["name"], "labsweep");
        assert!(!block["version"].as_str().unwrap().is_empty());
    }
}
