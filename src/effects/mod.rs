//! Модуль планирования визуальных эффектов
//!
//! Для каждого окна выбирается основное действие, по нему строится один
//! эффект. Геометрия берется из рамки действия без пересчета.

use serde_json::{json, Map, Value};
use crate::instructions::{normalize_action, SELECTOR_KEYS};
use crate::models::{ActionEvent, DisplayEffect, EffectTarget, TimelineItem, Window};

/// Доля окна, которую занимает эффект
pub const EFFECT_COVERAGE_RATIO: f64 = 0.75;
/// Минимальная длительность эффекта, секунды
pub const MIN_EFFECT_DURATION_SEC: f64 = 0.4;
/// Масштаб легкого приближения при клике
pub const CLICK_ZOOM_SCALE: f64 = 1.08;

const LABEL_KEYS: &[&str] = &["text", "ariaLabel", "label", "name"];

/// Основное действие окна: первое действие внутри `[start, end]`, кроме прокрутки
pub fn find_primary_action<'a>(timeline: &'a [TimelineItem], window: &Window) -> Option<&'a ActionEvent> {
    timeline
        .iter()
        .filter_map(TimelineItem::as_action)
        .filter(|a| window.contains(a.time))
        .find(|a| normalize_action(&a.action) != Some("scroll"))
}

/// Построить визуальные эффекты для окон
pub fn generate_effects(timeline: &[TimelineItem], windows: &[Window], duration: f64) -> Vec<DisplayEffect> {
    windows
        .iter()
        .filter(|w| w.end > w.start)
        .filter_map(|w| {
            let action = find_primary_action(timeline, w)?;
            effect_for_action(action, w, duration)
        })
        .collect()
}

fn effect_for_action(action: &ActionEvent, window: &Window, duration: f64) -> Option<DisplayEffect> {
    let start = window.start;
    let end = (start + MIN_EFFECT_DURATION_SEC.max(window.duration() * EFFECT_COVERAGE_RATIO))
        .min(window.end)
        .min(duration);
    if end <= start {
        return None;
    }

    let (effect_type, style) = match normalize_action(&action.action)? {
        "click" => (
            "highlight",
            json!({
                "outline": "glow",
                "dimBackground": true,
                "zoom": { "enabled": true, "scale": CLICK_ZOOM_SCALE },
            }),
        ),
        "input" => (
            "focus",
            json!({ "borderColor": "#0066ff", "borderWidth": 3, "dimBackground": true }),
        ),
        "hover" => ("highlight", json!({ "outline": "soft", "opacity": 0.7 })),
        "navigate" => {
            let label = action.target_str(LABEL_KEYS)?;
            return Some(DisplayEffect {
                start,
                end,
                effect_type: "label".to_string(),
                target: None,
                style: into_map(json!({
                    "text": label,
                    "position": "top-center",
                    "fontSize": "14px",
                    "fontColor": "#ffffff",
                })),
            });
        }
        _ => return None,
    };

    // геометрическим эффектам нужна рамка с положительными размерами
    let bounds = action.bounds.filter(|b| b.is_positive())?;

    Some(DisplayEffect {
        start,
        end,
        effect_type: effect_type.to_string(),
        target: Some(EffectTarget {
            selector: action.target_str(SELECTOR_KEYS).map(str::to_string),
            bounds: Some(bounds),
        }),
        style: into_map(style),
    })
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
