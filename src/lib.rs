//! Основной файл библиотеки narration-sync
//!
//! Библиотека объединяет распознанную речь и действия пользователя из записи
//! экрана в единый таймлайн, выделяет окна озвучки, синтезирует речь и
//! сводит ее с фоновой музыкой в одну аудиодорожку, после чего проверяет
//! согласованность всех результатов.

pub mod audio;
pub mod config;
pub mod effects;
pub mod error;
pub mod instructions;
pub mod models;
pub mod progress;
pub mod timeline;
pub mod utils;
pub mod validate;
pub mod windows;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use async_trait::async_trait;
use crate::audio::{AudioMixEngine, FfmpegRenderer, MixRenderer, SpeechSynthesizer};
use crate::models::{
    ActionEvent, Narration, NarrationSegment, SessionInput, SessionOutput, TimelineItem, Window,
};
use crate::progress::{ProcessStep, ProgressObserver, ProgressReporter, ProgressTracker};

pub use crate::config::NarrationSyncConfig;
pub use crate::error::{NarrationSyncError, Result};
pub use crate::validate::ValidationError;

/// Максимальная длительность записи, секунды
pub const MAX_VIDEO_DURATION_SEC: f64 = 3600.0;

/// Источник текстов озвучки для окон (например, языковая модель)
#[async_trait]
pub trait NarrationSource: Send + Sync {
    /// Вернуть сегменты озвучки; i-й сегмент относится к i-му окну
    async fn narrate(
        &self,
        timeline: &[TimelineItem],
        windows: &[Window],
        duration: f64,
    ) -> Result<Vec<NarrationSegment>>;
}

/// Заранее подготовленные сегменты озвучки
#[async_trait]
impl NarrationSource for Vec<NarrationSegment> {
    async fn narrate(
        &self,
        _timeline: &[TimelineItem],
        _windows: &[Window],
        _duration: f64,
    ) -> Result<Vec<NarrationSegment>> {
        Ok(self.clone())
    }
}

/// Подготовленная сессия: проверенные входные данные, таймлайн и окна
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub session_id: String,
    pub duration: f64,
    pub timeline: Vec<TimelineItem>,
    pub windows: Vec<Window>,
}

impl SessionPlan {
    /// Действия таймлайна в порядке времени
    pub fn actions(&self) -> Vec<ActionEvent> {
        self.timeline.iter().filter_map(TimelineItem::as_action).cloned().collect()
    }
}

fn check_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() {
        return Err(NarrationSyncError::input("session", "session id is empty"));
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(NarrationSyncError::input(
            "session",
            format!("session id '{}' contains unsupported characters", session_id),
        ));
    }
    Ok(())
}

fn check_duration(duration: f64) -> Result<()> {
    if !duration.is_finite() || duration <= 0.0 || duration > MAX_VIDEO_DURATION_SEC {
        return Err(NarrationSyncError::input(
            "session",
            format!(
                "video duration {} is outside (0, {}] seconds",
                duration, MAX_VIDEO_DURATION_SEC
            ),
        ));
    }
    Ok(())
}

/// Основная структура для работы с библиотекой
pub struct NarrationSync {
    /// Конфигурация библиотеки
    config: NarrationSyncConfig,
    /// Движок сведения аудио
    engine: AudioMixEngine,
    /// Репортер прогресса; состояние прогресса создается на каждый запрос
    progress_reporter: Option<Box<dyn ProgressReporter>>,
}

impl NarrationSync {
    /// Создать экземпляр с явно заданными синтезатором речи и рендерером
    pub fn new(
        config: NarrationSyncConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        renderer: Arc<dyn MixRenderer>,
    ) -> Self {
        let engine = AudioMixEngine::new(&config, synthesizer, renderer);
        Self {
            config,
            engine,
            progress_reporter: None,
        }
    }

    /// Создать экземпляр по конфигурации: провайдер TTS из настроек и ffmpeg
    pub fn from_config(config: NarrationSyncConfig) -> Result<Self> {
        config.validate()?;
        let synthesizer = audio::create_synthesizer(&config.tts)?;
        let renderer = Arc::new(FfmpegRenderer::locate(config.ffmpeg_path.as_deref())?);
        Ok(Self::new(config, synthesizer, renderer))
    }

    pub fn config(&self) -> &NarrationSyncConfig {
        &self.config
    }

    /// Установить репортер прогресса
    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.progress_reporter = Some(reporter);
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.progress_reporter
            .get_or_insert_with(|| Box::new(progress::DefaultProgressReporter::new()))
            .add_observer(observer)
    }

    fn new_tracker(&self) -> Option<ProgressTracker<'_>> {
        self.progress_reporter
            .as_deref()
            .map(|reporter| ProgressTracker::with_reporter(reporter))
    }

    /// Проверить входные данные, построить таймлайн и выделить окна
    pub fn prepare(&self, input: &SessionInput) -> Result<SessionPlan> {
        self.prepare_with(input, None)
    }

    fn prepare_with(&self, input: &SessionInput, tracker: Option<&ProgressTracker<'_>>) -> Result<SessionPlan> {
        check_session_id(&input.session_id)?;
        check_duration(input.video_duration_sec)?;

        if let Some(t) = tracker {
            t.set_step(ProcessStep::TimelineBuild);
        }
        let timeline = timeline::build_timeline(input.transcript.as_ref(), input.actions.clone());
        timeline::check_timeline(&timeline)?;

        if let Some(t) = tracker {
            t.set_step(ProcessStep::WindowExtraction);
        }
        let windows = windows::extract_windows(&timeline, input.video_duration_sec);
        log::info!(
            "Session {}: {} timeline items, {} narration windows",
            input.session_id,
            timeline.len(),
            windows.len()
        );

        Ok(SessionPlan {
            session_id: input.session_id.clone(),
            duration: input.video_duration_sec,
            timeline,
            windows,
        })
    }

    /// Полная обработка сессии
    pub async fn process(&self, input: &SessionInput, source: &dyn NarrationSource) -> Result<SessionOutput> {
        log::info!("Starting narration processing for session {}", input.session_id);
        let progress = self.new_tracker();
        let tracker = progress.as_ref();
        let plan = self.prepare_with(input, tracker)?;
        let duration = plan.duration;

        // 1. Тексты озвучки
        if let Some(t) = tracker {
            t.set_step(ProcessStep::NarrationPlanning);
        }
        let segments = source.narrate(&plan.timeline, &plan.windows, duration).await?;
        if segments.len() > plan.windows.len() {
            log::warn!(
                "Narration source returned {} segments for {} windows",
                segments.len(),
                plan.windows.len()
            );
        }
        let narrations = Narration::from_segments(segments);

        // 2. Аудиофрагменты
        if let Some(t) = tracker {
            t.set_step(ProcessStep::ChunkMapping);
        }
        let chunks = audio::map_narrations_to_chunks(&narrations, self.engine.provider_name());

        // 3. Синтез и сведение
        let audio = if chunks.is_empty() {
            log::warn!("No narration text to synthesize, skipping audio mix");
            None
        } else {
            let result = self.engine.mix(&plan.session_id, &chunks, duration, tracker).await?;
            if !result.report.failed.is_empty() {
                log::warn!(
                    "Mixed without {} of {} chunks: {:?}",
                    result.report.failed.len(),
                    chunks.len(),
                    result.report.failed
                );
            }
            Some(result.artifact)
        };

        // 4. Инструкции и эффекты
        let instructions = instructions::generate_action_instructions(&plan.actions(), duration)?;
        let display_effects = effects::generate_effects(&plan.timeline, &plan.windows, duration);

        // 5. Финальная проверка
        if let Some(t) = tracker {
            t.set_step(ProcessStep::Validation);
        }
        if let Err(e) = validate::validate_final_output(
            duration,
            &plan.windows,
            &narrations,
            &chunks,
            &instructions,
            &display_effects,
        ) {
            log::error!("Session {} failed validation: {}", plan.session_id, e);
            if let Some(artifact) = &audio {
                if let Err(io) = tokio::fs::remove_file(&artifact.path).await {
                    log::warn!("Failed to remove artifact {}: {}", artifact.path.display(), io);
                }
            }
            return Err(e.into());
        }

        if let Some(t) = tracker {
            t.complete();
        }
        log::info!("Session {} processed successfully", plan.session_id);

        Ok(SessionOutput {
            session_id: plan.session_id,
            video_duration: duration,
            windows: plan.windows,
            narrations,
            audio_chunks: chunks,
            instructions,
            display_effects,
            audio,
        })
    }
}
