//! Модуль обработки ошибок библиотеки narration-sync
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при работе библиотеки.

use thiserror::Error;
use crate::validate::ValidationError;

/// Ошибки библиотеки narration-sync
#[derive(Debug, Error)]
pub enum NarrationSyncError {
    /// Некорректные входные данные (таймлайн, длительность, идентификатор сессии)
    #[error("Input error: {0}")]
    Input(String),

    /// Ошибка внешнего сервиса (TTS провайдер, рендерер)
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Спецификацию микса не удалось выполнить
    #[error("Mix render error: {0}")]
    MixRender(String),

    /// Нарушен инвариант синхронизации
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl NarrationSyncError {
    /// Ошибка входных данных с указанием этапа
    pub fn input(stage: &str, message: impl std::fmt::Display) -> Self {
        Self::Input(format!("[{}] {}", stage, message))
    }
}

impl From<&str> for NarrationSyncError {
    fn from(s: &str) -> Self {
        NarrationSyncError::Other(s.to_string())
    }
}

impl From<String> for NarrationSyncError {
    fn from(s: String) -> Self {
        NarrationSyncError::Other(s)
    }
}

/// Тип Result для библиотеки narration-sync
pub type Result<T> = std::result::Result<T, NarrationSyncError>;
