use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use super::{
    ActionEvent, ActionInstruction, AudioChunk, DisplayEffect, Narration, Transcript, Window,
};

/// Входные данные одной сессии записи
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInput {
    pub session_id: String,
    pub video_duration_sec: f64,
    #[serde(default)]
    pub transcript: Option<Transcript>,
    #[serde(default)]
    pub actions: Vec<ActionEvent>,
}

/// Итоговый аудиофайл
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioArtifact {
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub url: String,
}

/// Результат обработки сессии
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutput {
    pub session_id: String,
    pub video_duration: f64,
    pub windows: Vec<Window>,
    pub narrations: Vec<Narration>,
    pub audio_chunks: Vec<AudioChunk>,
    pub instructions: Vec<ActionInstruction>,
    pub display_effects: Vec<DisplayEffect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioArtifact>,
}
