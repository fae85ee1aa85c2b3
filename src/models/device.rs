use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::keys;

/// The physical unit under test. `id` and `kind` identify the device for
/// fingerprinting; `parameters` carries device-specific data from the chip
/// description file (coordinates, port count, ...) verbatim into the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

impl Device {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// The `device` block of a measurement record: id and type first, then
    /// the device-specific parameters. `id`/`type` keys inside `parameters`
    /// cannot shadow the identity fields.
    pub fn record_block(&self) -> Value {
        let mut block = Map::new();
        block.insert(keys::DEVICE_ID.into(), Value::String(self.id.clone()));
        block.insert(keys::DEVICE_TYPE.into(), Value::String(self.kind.clone()));
        for (key, value) in &self.parameters {
            if key != keys::DEVICE_ID && key != keys::DEVICE_TYPE {
                block.insert(key.clone(), value.clone());
            }
        }
        Value::Object(block)
    }

    pub fn short_str(&self) -> String {
        format!("device id={} type={}", self.id, self.kind)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_block_leads_with_identity_fields() {
        let device = Device::new("17", "MZI")
            .with_parameter("x position", json!(1250.5))
            .with_parameter("id", json!("shadowed"));

        let block = device.record_block();
        let obj = block.as_object().unwrap();
        let field_order: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(field_order, vec!["id", "type", "x position"]);
        assert_eq!(obj["id"], json!("17"));
    }
}
