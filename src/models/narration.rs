use serde::{Deserialize, Serialize};

/// Сегмент текста озвучки от внешнего генератора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub music_style: String,
}

/// Текст озвучки, привязанный к окну
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narration {
    pub window_index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub music_style: String,
}

impl Narration {
    /// Привязать сегменты к окнам по позиции
    pub fn from_segments(segments: Vec<NarrationSegment>) -> Vec<Narration> {
        segments
            .into_iter()
            .enumerate()
            .map(|(window_index, s)| Narration {
                window_index,
                start: s.start,
                end: s.end,
                text: s.text,
                music_style: s.music_style,
            })
            .collect()
    }
}

/// Фрагмент синтезируемого аудио, привязанный к окну
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioChunk {
    pub window_index: usize,
    pub start: f64,
    pub end: f64,
    /// Номинальная длительность `end - start`
    pub duration: f64,
    pub text: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub music_style: String,
}
