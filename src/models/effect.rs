use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use super::BoundingBox;

/// Цель визуального эффекта
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
}

/// Визуальный эффект при воспроизведении
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayEffect {
    pub start: f64,
    pub end: f64,
    /// "highlight" | "zoom" | "focus" | "dim" | "blur" | "label"
    #[serde(rename = "type")]
    pub effect_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EffectTarget>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub style: Map<String, Value>,
}
