//! Модуль построения инструкций воспроизведения действий

use serde_json::{Map, Value};
use crate::error::{NarrationSyncError, Result};
use crate::models::{ActionEvent, ActionInstruction};

/// Ключи метаданных цели, из которых берется селектор (по приоритету)
pub const SELECTOR_KEYS: &[&str] = &["selector", "cssSelector", "id", "name"];

/// Привести тип действия к каноническому виду.
///
/// Неизвестные типы возвращают `None`.
pub fn normalize_action(action: &str) -> Option<&'static str> {
    match action.to_lowercase().as_str() {
        "click" => Some("click"),
        "input" | "type" => Some("input"),
        "scroll" => Some("scroll"),
        "hover" => Some("hover"),
        "zoom" => Some("zoom"),
        "navigation" | "navigate" | "route_change" => Some("navigate"),
        _ => None,
    }
}

fn suggest_effects(action: &str) -> Vec<String> {
    let effects: &[&str] = match action {
        "click" => &["highlight", "zoom"],
        "input" => &["focus"],
        "navigate" => &["label"],
        _ => &[],
    };
    effects.iter().map(|e| e.to_string()).collect()
}

fn extract_metadata(action: &ActionEvent) -> Option<Map<String, Value>> {
    let target = action.target.as_ref()?;
    let metadata: Map<String, Value> = ["ariaLabel", "text"]
        .iter()
        .filter_map(|key| target.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect();
    (!metadata.is_empty()).then_some(metadata)
}

/// Построить инструкции для фронтенда из действий пользователя.
///
/// Время ограничивается диапазоном `[0, duration]`, действия неизвестных
/// типов отбрасываются. Рамки с неположительными размерами не переносятся.
pub fn generate_action_instructions(actions: &[ActionEvent], duration: f64) -> Result<Vec<ActionInstruction>> {
    if !(duration > 0.0) {
        return Err(NarrationSyncError::input(
            "instructions",
            format!("invalid video duration {}", duration),
        ));
    }

    let mut instructions = Vec::with_capacity(actions.len());
    for (i, action) in actions.iter().enumerate() {
        let Some(kind) = normalize_action(&action.action) else {
            log::debug!("Skipping action {} with unknown type '{}'", i, action.action);
            continue;
        };

        let bounds = action.bounds.filter(|b| b.is_positive());
        if action.bounds.is_some() && bounds.is_none() {
            log::debug!("Dropping degenerate bounds of action {}", i);
        }

        instructions.push(ActionInstruction {
            timestamp: action.time.clamp(0.0, duration),
            action: kind.to_string(),
            selector: action.target_str(SELECTOR_KEYS).map(str::to_string),
            bounds,
            metadata: extract_metadata(action),
            effects: suggest_effects(kind),
        });
    }

    Ok(instructions)
}
