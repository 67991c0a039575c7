use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use super::BoundingBox;

/// Инструкция воспроизведения действия для фронтенда
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstruction {
    #[serde(rename = "t")]
    pub timestamp: f64,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
}
