//! Преобразование текстов озвучки в аудиофрагменты

use crate::models::{AudioChunk, Narration};

/// Преобразовать тексты озвучки в аудиофрагменты.
///
/// Пустые тексты и интервалы с неположительной длительностью отбрасываются,
/// остальные переносятся без изменений и в исходном порядке.
pub fn map_narrations_to_chunks(narrations: &[Narration], provider: &str) -> Vec<AudioChunk> {
    narrations
        .iter()
        .filter(|n| !n.text.trim().is_empty())
        .filter(|n| n.end - n.start > 0.0)
        .map(|n| AudioChunk {
            window_index: n.window_index,
            start: n.start,
            end: n.end,
            duration: n.end - n.start,
            text: n.text.clone(),
            provider: provider.to_string(),
            music_style: n.music_style.clone(),
        })
        .collect()
}
