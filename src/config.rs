//! Модуль конфигурации библиотеки narration-sync
//!
//! Этот модуль содержит структуры и перечисления для настройки библиотеки.
//! Вся конфигурация передается в движок при создании, глобального состояния нет.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{NarrationSyncError, Result};

/// Провайдер синтеза речи
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    /// Deepgram Aura
    Deepgram,
    /// OpenAI audio/speech
    OpenAi,
}

impl Default for TtsProvider {
    fn default() -> Self {
        Self::Deepgram
    }
}

impl TtsProvider {
    /// Получить строковое представление провайдера
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deepgram => "deepgram",
            Self::OpenAi => "openai",
        }
    }

    /// Модель по умолчанию для провайдера
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Deepgram => "aura-stella-en",
            Self::OpenAi => "tts-1",
        }
    }

    /// Адрес API по умолчанию для провайдера
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Deepgram => "https://api.deepgram.com/v1/speak",
            Self::OpenAi => "https://api.openai.com/v1/audio/speech",
        }
    }
}

/// Настройки синтеза речи
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Провайдер TTS
    pub provider: TtsProvider,
    /// API ключ провайдера
    pub api_key: String,
    /// Модель (если не задана, используется модель провайдера по умолчанию)
    pub model: Option<String>,
    /// Голос (используется только OpenAI)
    pub voice: String,
    /// Адрес API (если не задан, используется адрес провайдера по умолчанию)
    pub endpoint: Option<String>,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            api_key: String::new(),
            model: None,
            voice: "nova".to_string(),
            endpoint: None,
        }
    }
}

impl TtsSettings {
    /// Фактическая модель
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or_else(|| self.provider.default_model())
    }

    /// Фактический адрес API
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or_else(|| self.provider.default_endpoint())
    }
}

/// Параметры сведения дорожек
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixSettings {
    /// Частота дискретизации тишины и голосовых дорожек
    pub sample_rate: u32,
    /// Усиление голоса
    pub voice_gain: f32,
    /// Запас после конца голосовой дорожки, чтобы обрезка не звучала как обрыв (сек)
    pub voice_padding_sec: f64,
    /// Усиление высоких частот голоса (дБ)
    pub treble_gain_db: f32,
    /// Громкость фоновой музыки (0.0 - 1.0)
    pub music_gain: f32,
    /// Слои музыки короче этого значения не добавляются (сек)
    pub min_music_layer_sec: f64,
    /// Стиль музыки, если у чанка он не указан
    pub default_music_style: String,
    /// Директория с фоновыми треками `<style>.mp3`
    pub music_dir: PathBuf,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            voice_gain: 1.5,
            voice_padding_sec: 0.2,
            treble_gain_db: 5.0,
            music_gain: 0.08,
            min_music_layer_sec: 0.1,
            default_music_style: "upbeat".to_string(),
            music_dir: PathBuf::from("assets/music"),
        }
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationSyncConfig {
    /// Настройки TTS
    pub tts: TtsSettings,
    /// Настройки микса
    pub mix: MixSettings,
    /// Директория для итоговых аудиофайлов
    pub output_dir: PathBuf,
    /// Публичный префикс пути, по которому раздаются аудиофайлы
    pub public_path_prefix: String,
    /// Директория для временных файлов (если не задана, системная)
    pub work_dir: Option<PathBuf>,
    /// Максимальное количество одновременных запросов к TTS
    pub max_concurrent_requests: usize,
    /// Таймаут одного запроса синтеза (сек)
    pub synthesis_timeout_sec: u64,
    /// Таймаут рендеринга микса (сек)
    pub render_timeout_sec: u64,
    /// Путь к ffmpeg (если не задан, ищется в PATH)
    pub ffmpeg_path: Option<PathBuf>,
    /// Удалять временные файлы после завершения
    pub cleanup_temp_files: bool,
}

impl Default for NarrationSyncConfig {
    fn default() -> Self {
        Self {
            tts: TtsSettings::default(),
            mix: MixSettings::default(),
            output_dir: PathBuf::from("instructions/temp_audio"),
            public_path_prefix: "/audio".to_string(),
            work_dir: None,
            max_concurrent_requests: 4,
            synthesis_timeout_sec: 30,
            render_timeout_sec: 300,
            ffmpeg_path: None,
            cleanup_temp_files: true,
        }
    }
}

impl NarrationSyncConfig {
    /// Загрузить конфигурацию из JSON файла
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NarrationSyncError::Configuration(format!(
                "Failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Переопределить значения из переменных окружения
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("NARRATION_TTS_API_KEY") {
            if !key.trim().is_empty() {
                self.tts.api_key = key;
            }
        }
        if let Ok(dir) = std::env::var("NARRATION_MUSIC_DIR") {
            self.mix.music_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("NARRATION_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        self
    }

    /// Проверить конфигурацию
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(NarrationSyncError::Configuration(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.synthesis_timeout_sec == 0 || self.render_timeout_sec == 0 {
            return Err(NarrationSyncError::Configuration(
                "timeouts must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mix.music_gain) {
            return Err(NarrationSyncError::Configuration(format!(
                "music_gain must be within 0.0 - 1.0, got {}",
                self.mix.music_gain
            )));
        }
        if self.mix.sample_rate == 0 {
            return Err(NarrationSyncError::Configuration(
                "sample_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Таймаут синтеза
    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_sec)
    }

    /// Таймаут рендеринга
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_sec)
    }
}
