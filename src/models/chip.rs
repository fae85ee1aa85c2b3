use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The chip under test: a user-given name plus the path of the layout
/// description file it was loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chip {
    pub name: String,
    pub description_file_path: PathBuf,
}

impl Chip {
    pub fn new(name: impl Into<String>, description_file_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description_file_path: description_file_path.into(),
        }
    }

    /// The `chip` block of a measurement record.
    pub fn record_block(&self) -> Value {
        json!({
            "name": self.name,
            "description file path": self.description_file_path.display().to_string(),
        })
    }
}

impl Default for Chip {
    fn default() -> Self {
        Self {
            name: "UnknownChip".into(),
            description_file_path: PathBuf::new(),
        }
    }
}
