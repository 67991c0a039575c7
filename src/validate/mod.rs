//! Модуль финальной проверки синхронизации
//!
//! Проверки выполняются по порядку: длительность, окна, тексты озвучки,
//! аудиофрагменты, инструкции, эффекты. Возвращается первая найденная ошибка.

use thiserror::Error;
use crate::models::{ActionInstruction, AudioChunk, DisplayEffect, Narration, Window};

/// Допустимое превышение длительности аудио над окном (сек)
pub const MAX_ALLOWED_DRIFT_SEC: f64 = 0.15;

/// Нарушение инварианта синхронизации
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid video duration {0:.2}")]
    InvalidDuration(f64),

    #[error("window {index} has negative time")]
    WindowNegativeTime { index: usize },

    #[error("window {index} has invalid range {start:.2}-{end:.2}")]
    WindowInvalidRange { index: usize, start: f64, end: f64 },

    #[error("window {index} exceeds video duration ({end:.2} > {duration:.2})")]
    WindowExceedsDuration { index: usize, end: f64, duration: f64 },

    #[error("window {index} overlaps previous window ({start:.2} < {previous_end:.2})")]
    WindowOverlap { index: usize, start: f64, previous_end: f64 },

    #[error("narration {index} references invalid window {window_index}")]
    NarrationInvalidWindow { index: usize, window_index: usize },

    #[error(
        "narration {index} out of window bounds ({start:.2}-{end:.2} vs {window_start:.2}-{window_end:.2})"
    )]
    NarrationOutOfBounds {
        index: usize,
        start: f64,
        end: f64,
        window_start: f64,
        window_end: f64,
    },

    #[error("audio chunk {index} references invalid window {window_index}")]
    AudioInvalidWindow { index: usize, window_index: usize },

    #[error("audio chunk {index} duration must be positive, got {duration:.3}")]
    AudioNonPositiveDuration { index: usize, duration: f64 },

    #[error("audio chunk {index} duration {duration:.3}s exceeds window {window_duration:.3}s")]
    AudioExceedsWindow {
        index: usize,
        duration: f64,
        window_duration: f64,
    },

    #[error("action {index} has invalid timestamp {timestamp:.2}")]
    ActionInvalidTimestamp { index: usize, timestamp: f64 },

    #[error("action {index} has empty action type")]
    ActionEmptyType { index: usize },

    #[error("action {index} has invalid bounds")]
    ActionInvalidBounds { index: usize },

    #[error("effect {index} has negative time")]
    EffectNegativeTime { index: usize },

    #[error("effect {index} has invalid range {start:.2}-{end:.2}")]
    EffectInvalidRange { index: usize, start: f64, end: f64 },

    #[error("effect {index} exceeds video duration ({end:.2} > {duration:.2})")]
    EffectExceedsDuration { index: usize, end: f64, duration: f64 },

    #[error("effect {index} missing type")]
    EffectMissingType { index: usize },

    #[error("effect {index} has invalid bounds")]
    EffectInvalidBounds { index: usize },
}

/// Финальная проверка синхронизации перед отдачей результата
pub fn validate_final_output(
    video_duration: f64,
    windows: &[Window],
    narrations: &[Narration],
    audio_chunks: &[AudioChunk],
    actions: &[ActionInstruction],
    effects: &[DisplayEffect],
) -> Result<(), ValidationError> {
    if !(video_duration > 0.0) {
        return Err(ValidationError::InvalidDuration(video_duration));
    }

    validate_windows(video_duration, windows)?;
    validate_narrations(windows, narrations)?;
    validate_audio_sync(windows, audio_chunks)?;
    validate_actions(video_duration, actions)?;
    validate_effects(video_duration, effects)?;

    Ok(())
}

/// Окна корректны и не пересекаются
fn validate_windows(video_duration: f64, windows: &[Window]) -> Result<(), ValidationError> {
    let mut last_end = 0.0;

    for (index, w) in windows.iter().enumerate() {
        if w.start < 0.0 || w.end < 0.0 {
            return Err(ValidationError::WindowNegativeTime { index });
        }
        if w.start >= w.end {
            return Err(ValidationError::WindowInvalidRange { index, start: w.start, end: w.end });
        }
        if w.end > video_duration {
            return Err(ValidationError::WindowExceedsDuration {
                index,
                end: w.end,
                duration: video_duration,
            });
        }
        if w.start < last_end {
            return Err(ValidationError::WindowOverlap {
                index,
                start: w.start,
                previous_end: last_end,
            });
        }
        last_end = w.end;
    }

    Ok(())
}

/// Текст озвучки не выходит за свое окно
fn validate_narrations(windows: &[Window], narrations: &[Narration]) -> Result<(), ValidationError> {
    for (index, n) in narrations.iter().enumerate() {
        // тишина допустима
        if n.text.trim().is_empty() {
            continue;
        }

        let w = windows
            .get(n.window_index)
            .ok_or(ValidationError::NarrationInvalidWindow { index, window_index: n.window_index })?;

        if !w.contains_range(n.start, n.end) {
            return Err(ValidationError::NarrationOutOfBounds {
                index,
                start: n.start,
                end: n.end,
                window_start: w.start,
                window_end: w.end,
            });
        }
    }

    Ok(())
}

/// Аудио не переживает свое окно больше допуска
fn validate_audio_sync(windows: &[Window], audio_chunks: &[AudioChunk]) -> Result<(), ValidationError> {
    for (index, a) in audio_chunks.iter().enumerate() {
        let w = windows
            .get(a.window_index)
            .ok_or(ValidationError::AudioInvalidWindow { index, window_index: a.window_index })?;
        let window_duration = w.duration();

        if !(a.duration > 0.0) {
            return Err(ValidationError::AudioNonPositiveDuration { index, duration: a.duration });
        }
        if a.duration > window_duration + MAX_ALLOWED_DRIFT_SEC {
            return Err(ValidationError::AudioExceedsWindow {
                index,
                duration: a.duration,
                window_duration,
            });
        }
    }

    Ok(())
}

fn validate_actions(video_duration: f64, actions: &[ActionInstruction]) -> Result<(), ValidationError> {
    for (index, a) in actions.iter().enumerate() {
        if !(a.timestamp >= 0.0 && a.timestamp <= video_duration) {
            return Err(ValidationError::ActionInvalidTimestamp { index, timestamp: a.timestamp });
        }
        if a.action.is_empty() {
            return Err(ValidationError::ActionEmptyType { index });
        }
        if let Some(bounds) = &a.bounds {
            if !bounds.is_positive() {
                return Err(ValidationError::ActionInvalidBounds { index });
            }
        }
    }

    Ok(())
}

fn validate_effects(video_duration: f64, effects: &[DisplayEffect]) -> Result<(), ValidationError> {
    for (index, e) in effects.iter().enumerate() {
        if e.start < 0.0 || e.end < 0.0 {
            return Err(ValidationError::EffectNegativeTime { index });
        }
        if e.start >= e.end {
            return Err(ValidationError::EffectInvalidRange { index, start: e.start, end: e.end });
        }
        if e.end > video_duration {
            return Err(ValidationError::EffectExceedsDuration {
                index,
                end: e.end,
                duration: video_duration,
            });
        }
        if e.effect_type.is_empty() {
            return Err(ValidationError::EffectMissingType { index });
        }
        let target_bounds = e.target.as_ref().and_then(|t| t.bounds.as_ref());
        if let Some(bounds) = target_bounds {
            if !bounds.is_positive() {
                return Err(ValidationError::EffectInvalidBounds { index });
            }
        }
    }

    Ok(())
}
