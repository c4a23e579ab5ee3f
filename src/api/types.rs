//! Payload types of the status API.
//!
//! The backend is loosely typed (mappings and lists are used interchangeably),
//! so the deserializers here normalize every response into an ordered shape
//! the views can render directly.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Fallback shown for a running module that has not reported any info yet.
pub const UNKNOWN_MODULE_STATUS: &str = "Çalışıyor?";

// ============================================================================
// Status messages
// ============================================================================

/// A status or log line published by one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
  pub author: String,
  pub title: String,
  pub content: String,
}

/// The `/statuses` payload.
///
/// The backend serves `author -> status` (sometimes `author -> [status]`) or a
/// plain list. Values are flattened in document order. Duplicate authors are
/// kept as they arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBoard {
  statuses: Vec<StatusMessage>,
}

impl StatusBoard {
  pub fn statuses(&self) -> &[StatusMessage] {
    &self.statuses
  }

  pub fn len(&self) -> usize {
    self.statuses.len()
  }
}

impl<'de> Deserialize<'de> for StatusBoard {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    let items = match value {
      Value::Array(items) => items,
      Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
      Value::Null => Vec::new(),
      other => {
        return Err(de::Error::custom(format!(
          "expected a list or mapping of statuses, got {}",
          other
        )))
      }
    };

    let parse = |v: Value| serde_json::from_value::<StatusMessage>(v);
    let mut statuses = Vec::with_capacity(items.len());
    for item in items {
      match item {
        Value::Array(nested) => {
          for status in nested {
            statuses.push(parse(status).map_err(<D::Error as de::Error>::custom)?);
          }
        }
        single => statuses.push(parse(single).map_err(<D::Error as de::Error>::custom)?),
      }
    }

    Ok(Self { statuses })
  }
}

// ============================================================================
// Sensor values
// ============================================================================

/// One labelled sensor value, with the value kept in its JSON spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
  pub label: String,
  pub value: String,
}

/// The `/values` payload: `label -> number`, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorValues {
  readings: Vec<SensorReading>,
}

impl SensorValues {
  pub fn readings(&self) -> &[SensorReading] {
    &self.readings
  }

  pub fn len(&self) -> usize {
    self.readings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.readings.is_empty()
  }
}

impl<'de> Deserialize<'de> for SensorValues {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let map = Map::<String, Value>::deserialize(deserializer)?;
    let readings = map
      .into_iter()
      .map(|(label, value)| {
        let value = match value {
          Value::Number(n) => n.to_string(),
          // The simulation panel posts numeric strings, which the backend
          // may echo back untouched.
          Value::String(s) => s,
          other => {
            return Err(<D::Error as de::Error>::custom(format!(
              "value for {} is not a number: {}",
              label, other
            )))
          }
        };
        Ok(SensorReading { label, value })
      })
      .collect::<Result<Vec<_>, D::Error>>()?;

    Ok(Self { readings })
  }
}

// ============================================================================
// Modules
// ============================================================================

/// `module id -> author display name`, fetched once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ModuleAuthorMapping(HashMap<String, String>);

impl ModuleAuthorMapping {
  /// Display name for a module, falling back to the raw identifier.
  pub fn display_name<'a>(&'a self, module: &'a str) -> &'a str {
    self.0.get(module).map(String::as_str).unwrap_or(module)
  }
}

impl FromIterator<(String, String)> for ModuleAuthorMapping {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// `module id -> status string` from `/info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ModuleInfo(HashMap<String, String>);

impl ModuleInfo {
  pub fn status<'a>(&'a self, module: &str) -> &'a str {
    self
      .0
      .get(module)
      .map(String::as_str)
      .unwrap_or(UNKNOWN_MODULE_STATUS)
  }
}

impl FromIterator<(String, String)> for ModuleInfo {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ChangeModuleRequest<'a> {
  pub module_name: &'a str,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_board_from_mapping() {
    let board: StatusBoard =
      serde_json::from_str(r#"{"alice":{"author":"alice","title":"t","content":"c"}}"#).unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board.statuses()[0].author, "alice");
  }

  #[test]
  fn test_status_board_from_list_keeps_duplicates() {
    let board: StatusBoard = serde_json::from_str(
      r#"[
        {"author":"bob","title":"a","content":"1"},
        {"author":"bob","title":"b","content":"2"}
      ]"#,
    )
    .unwrap();
    let titles: Vec<_> = board.statuses().iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["a", "b"]);
  }

  #[test]
  fn test_status_board_flattens_nested_lists() {
    let board: StatusBoard = serde_json::from_str(
      r#"{"x":[{"author":"x","title":"1","content":""},{"author":"x","title":"2","content":""}],
          "y":{"author":"y","title":"3","content":""}}"#,
    )
    .unwrap();
    assert_eq!(board.len(), 3);
    assert_eq!(board.statuses()[2].author, "y");
  }

  #[test]
  fn test_status_board_rejects_scalar() {
    assert!(serde_json::from_str::<StatusBoard>("42").is_err());
  }

  #[test]
  fn test_sensor_values_keep_order_and_spelling() {
    let values: SensorValues =
      serde_json::from_str(r#"{"Sıcaklık": 21, "Nem": 40.5, "Işık": "7"}"#).unwrap();
    let rendered: Vec<_> = values
      .readings()
      .iter()
      .map(|r| format!("{}={}", r.label, r.value))
      .collect();
    assert_eq!(rendered, ["Sıcaklık=21", "Nem=40.5", "Işık=7"]);
  }

  #[test]
  fn test_sensor_values_reject_non_numbers() {
    assert!(serde_json::from_str::<SensorValues>(r#"{"Gaz": [1]}"#).is_err());
  }

  #[test]
  fn test_mapping_falls_back_to_module_id() {
    let mapping: ModuleAuthorMapping =
      serde_json::from_str(r#"{"mod_a": "Ayşe"}"#).unwrap();
    assert_eq!(mapping.display_name("mod_a"), "Ayşe");
    assert_eq!(mapping.display_name("mod_b"), "mod_b");
  }

  #[test]
  fn test_info_falls_back_to_unknown() {
    let info: ModuleInfo = serde_json::from_str(r#"{"mod_a": "hazır"}"#).unwrap();
    assert_eq!(info.status("mod_a"), "hazır");
    assert_eq!(info.status("mod_b"), UNKNOWN_MODULE_STATUS);
  }
}
