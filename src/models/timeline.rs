use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Положение и размеры элемента на экране
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Ширина и высота строго положительны
    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Слово из распознавания речи
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub punctuated_word: String,
}

/// Результат распознавания речи
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub words: Vec<TranscriptWord>,
}

/// Речевое событие таймлайна
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechWord {
    #[serde(rename = "t")]
    pub time: f64,
    pub word: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub punctuated_word: String,
    #[serde(default)]
    pub confidence: f64,
}

impl SpeechWord {
    /// Слово с пунктуацией, если оно есть
    pub fn display_text(&self) -> &str {
        if self.punctuated_word.is_empty() {
            &self.word
        } else {
            &self.punctuated_word
        }
    }
}

impl From<&TranscriptWord> for SpeechWord {
    fn from(w: &TranscriptWord) -> Self {
        Self {
            time: w.start,
            word: w.word.clone(),
            punctuated_word: w.punctuated_word.clone(),
            confidence: w.confidence,
        }
    }
}

/// Действие пользователя в интерфейсе
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    #[serde(rename = "t")]
    pub time: f64,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
}

impl ActionEvent {
    pub fn new(time: f64, action: impl Into<String>) -> Self {
        Self {
            time,
            action: action.into(),
            target: None,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_target(mut self, target: Map<String, Value>) -> Self {
        self.target = Some(target);
        self
    }

    /// Первое непустое строковое значение из метаданных цели по списку ключей
    pub fn target_str(&self, keys: &[&str]) -> Option<&str> {
        let target = self.target.as_ref()?;
        keys.iter()
            .filter_map(|k| target.get(*k))
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
    }
}

/// Событие канонического таймлайна
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineItem {
    #[serde(rename = "speech_word")]
    Speech(SpeechWord),
    Action(ActionEvent),
}

impl TimelineItem {
    /// Время события в секундах
    pub fn time(&self) -> f64 {
        match self {
            Self::Speech(w) => w.time,
            Self::Action(a) => a.time,
        }
    }

    pub fn as_speech(&self) -> Option<&SpeechWord> {
        match self {
            Self::Speech(w) => Some(w),
            Self::Action(_) => None,
        }
    }

    pub fn as_action(&self) -> Option<&ActionEvent> {
        match self {
            Self::Action(a) => Some(a),
            Self::Speech(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_item_json_shape() {
        let item = TimelineItem::Action(ActionEvent::new(1.5, "click"));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "action");
        assert_eq!(json["t"], 1.5);

        let parsed: TimelineItem =
            serde_json::from_str(r#"{"kind":"speech_word","t":0.4,"word":"hello","confidence":0.9}"#)
                .unwrap();
        assert_eq!(parsed.as_speech().map(|w| w.word.as_str()), Some("hello"));
    }

    #[test]
    fn test_target_str_priority() {
        let mut target = Map::new();
        target.insert("id".into(), Value::from("submit"));
        target.insert("selector".into(), Value::from(""));
        target.insert("name".into(), Value::from("send"));
        let action = ActionEvent::new(0.0, "click").with_target(target);

        assert_eq!(action.target_str(&["selector", "cssSelector", "id", "name"]), Some("submit"));
        assert_eq!(action.target_str(&["ariaLabel"]), None);
    }
}
