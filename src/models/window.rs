use serde::{Deserialize, Serialize};

/// Тип окна озвучки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// Окно, покрывающее сегмент речи
    Speech,
    /// Окно между сегментами речи, озвучивается по действиям
    GapFill,
}

/// Окно озвучки
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: f64,
    pub end: f64,
    #[serde(default = "default_kind")]
    pub kind: WindowKind,
}

fn default_kind() -> WindowKind {
    WindowKind::GapFill
}

impl Window {
    pub fn new(start: f64, end: f64, kind: WindowKind) -> Self {
        Self { start, end, kind }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Интервал `[start, end]` целиком внутри окна
    pub fn contains_range(&self, start: f64, end: f64) -> bool {
        start >= self.start && end <= self.end
    }

    /// Момент времени внутри окна (границы включительно)
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}
