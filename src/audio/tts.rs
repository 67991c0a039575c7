//! Модуль для интеграции с TTS провайдерами
//!
//! Один вызов `synthesize` превращает текст в байты аудио (mp3).

use std::sync::Arc;
use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use crate::config::{TtsProvider, TtsSettings};
use crate::error::{NarrationSyncError, Result};

/// Максимальная длина тела ответа об ошибке, попадающая в сообщение
const ERROR_BODY_LIMIT: usize = 300;

lazy_static! {
    static ref PAUSE_PUNCTUATION: Regex = Regex::new(r"([!?])").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Trait that all speech synthesis providers implement
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Имя провайдера для метаданных фрагментов
    fn provider_name(&self) -> &str;

    /// Синтезировать речь из текста
    async fn synthesize(&self, text: &str) -> Result<Bytes>;
}

/// Подготовка текста для TTS.
///
/// После `!` и `?` добавляется точка: так провайдер делает заметную паузу.
pub fn prepare_text_for_tts(text: &str) -> String {
    let text = PAUSE_PUNCTUATION.replace_all(text.trim(), "$1. ");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn reject_empty(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(NarrationSyncError::ExternalService("empty text".to_string()));
    }
    Ok(())
}

async fn read_audio_response(provider: &str, response: reqwest::Response) -> Result<Bytes> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
        let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        return Err(NarrationSyncError::ExternalService(format!(
            "{} error: {} - {}",
            provider, status, excerpt
        )));
    }

    let bytes = response.bytes().await.map_err(|e| {
        NarrationSyncError::ExternalService(format!("{}: failed to read audio: {}", provider, e))
    })?;
    if bytes.is_empty() {
        return Err(NarrationSyncError::ExternalService(format!("{}: received empty audio", provider)));
    }
    Ok(bytes)
}

/// Клиент Deepgram Aura
pub struct DeepgramClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl DeepgramClient {
    pub fn new(settings: &TtsSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            model: settings.model().to_string(),
            endpoint: settings.endpoint().to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for DeepgramClient {
    fn provider_name(&self) -> &str {
        TtsProvider::Deepgram.as_str()
    }

    async fn synthesize(&self, text: &str) -> Result<Bytes> {
        reject_empty(text)?;
        let text = prepare_text_for_tts(text);

        log::debug!("Sending TTS request to Deepgram ({} chars)", text.len());
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("model", self.model.as_str())])
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| NarrationSyncError::ExternalService(format!("deepgram request failed: {}", e)))?;

        read_audio_response("deepgram", response).await
    }
}

/// Клиент OpenAI TTS API
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    voice: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(settings: &TtsSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            model: settings.model().to_string(),
            voice: settings.voice.clone(),
            endpoint: settings.endpoint().to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    fn provider_name(&self) -> &str {
        TtsProvider::OpenAi.as_str()
    }

    async fn synthesize(&self, text: &str) -> Result<Bytes> {
        reject_empty(text)?;
        let text = prepare_text_for_tts(text);

        log::debug!("Sending TTS request to OpenAI ({} chars, voice {})", text.len(), self.voice);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "voice": self.voice,
                "input": text,
                "response_format": "mp3",
                "speed": 1.0
            }))
            .send()
            .await
            .map_err(|e| NarrationSyncError::ExternalService(format!("openai request failed: {}", e)))?;

        read_audio_response("openai", response).await
    }
}

/// Создать клиента TTS по настройкам
pub fn create_synthesizer(settings: &TtsSettings) -> Result<Arc<dyn SpeechSynthesizer>> {
    if settings.api_key.trim().is_empty() {
        log::error!("{} API key is empty", settings.provider.as_str());
        return Err(NarrationSyncError::Configuration(format!(
            "{} API key is required for speech synthesis",
            settings.provider.as_str()
        )));
    }

    log::info!("TTS Configuration:");
    log::info!("  Provider: {}", settings.provider.as_str());
    log::info!("  Model: {}", settings.model());

    let synthesizer: Arc<dyn SpeechSynthesizer> = match settings.provider {
        TtsProvider::Deepgram => Arc::new(DeepgramClient::new(settings)),
        TtsProvider::OpenAi => Arc::new(OpenAiClient::new(settings)),
    };
    Ok(synthesizer)
}
