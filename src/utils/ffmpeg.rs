//! Модуль для работы с FFmpeg
//!
//! Этот модуль содержит функции для поиска и проверки FFmpeg.

use std::path::{Path, PathBuf};
use std::process::Command;
use crate::error::{NarrationSyncError, Result};

/// Найти исполняемый файл ffmpeg: явный путь или поиск в PATH
pub fn find_ffmpeg(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(NarrationSyncError::Configuration(format!(
            "ffmpeg not found at {}",
            path.display()
        )));
    }

    which::which("ffmpeg").map_err(|e| {
        NarrationSyncError::Configuration(format!("ffmpeg not found in PATH: {}", e))
    })
}

/// Проверка наличия FFmpeg
pub fn check_ffmpeg_installed(ffmpeg: &Path) -> bool {
    Command::new(ffmpeg)
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Получение версии FFmpeg
pub fn get_ffmpeg_version(ffmpeg: &Path) -> Result<String> {
    let output = Command::new(ffmpeg).arg("-version").output()?;

    if !output.status.success() {
        return Err(NarrationSyncError::Other("Failed to get FFmpeg version".to_string()));
    }

    let version_str = String::from_utf8_lossy(&output.stdout);
    let first_line = version_str.lines().next().unwrap_or("");

    Ok(first_line.to_string())
}
