//! Движок сборки итоговой аудиодорожки
//!
//! Синтезирует речь для фрагментов с ограниченным параллелизмом, собирает
//! спецификацию микса и передает ее рендереру.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use crate::audio::mix::{build_mix_spec, MusicLibrary, VoiceSource};
use crate::audio::render::MixRenderer;
use crate::audio::tts::SpeechSynthesizer;
use crate::config::{MixSettings, NarrationSyncConfig};
use crate::error::{NarrationSyncError, Result};
use crate::models::{AudioArtifact, AudioChunk};
use crate::progress::{ProcessStep, ProgressTracker};
use crate::utils::temp::TempFileManager;

/// Сводка по сборке микса
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixReport {
    /// Индексы фрагментов с успешно синтезированной речью
    pub synthesized: Vec<usize>,
    /// Индексы фрагментов, для которых синтез не удался
    pub failed: Vec<usize>,
    pub voice_layers: usize,
    pub music_layers: usize,
}

/// Результат сборки микса
#[derive(Debug, Clone)]
pub struct MixResult {
    pub artifact: AudioArtifact,
    pub report: MixReport,
}

/// Движок сведения голоса и фоновой музыки
pub struct AudioMixEngine {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    renderer: Arc<dyn MixRenderer>,
    music: MusicLibrary,
    settings: MixSettings,
    output_dir: PathBuf,
    public_path_prefix: String,
    work_dir: Option<PathBuf>,
    max_concurrent_requests: usize,
    synthesis_timeout: Duration,
    render_timeout: Duration,
    cleanup_temp_files: bool,
}

impl AudioMixEngine {
    pub fn new(
        config: &NarrationSyncConfig,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        renderer: Arc<dyn MixRenderer>,
    ) -> Self {
        Self {
            synthesizer,
            renderer,
            music: MusicLibrary::from_settings(&config.mix),
            settings: config.mix.clone(),
            output_dir: config.output_dir.clone(),
            public_path_prefix: config.public_path_prefix.clone(),
            work_dir: config.work_dir.clone(),
            max_concurrent_requests: config.max_concurrent_requests.max(1),
            synthesis_timeout: config.synthesis_timeout(),
            render_timeout: config.render_timeout(),
            cleanup_temp_files: config.cleanup_temp_files,
        }
    }

    /// Имя провайдера синтеза речи
    pub fn provider_name(&self) -> &str {
        self.synthesizer.provider_name()
    }

    /// Публичный URL артефакта
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_path_prefix.trim_end_matches('/'), file_name)
    }

    /// Синтезировать речь для всех фрагментов и свести итоговую дорожку
    /// `<output_dir>/<session_id>.mp3`.
    ///
    /// Ошибка синтеза отдельного фрагмента только исключает его из микса.
    /// Если не удалось ни одного фрагмента, рендерер не вызывается.
    pub async fn mix(
        &self,
        session_id: &str,
        chunks: &[AudioChunk],
        total_duration: f64,
        tracker: Option<&ProgressTracker<'_>>,
    ) -> Result<MixResult> {
        if chunks.is_empty() {
            return Err(NarrationSyncError::input("mix", "no audio chunks to synthesize"));
        }

        let mut workspace = TempFileManager::new(
            session_id,
            self.work_dir.as_deref(),
            self.cleanup_temp_files,
        )?;

        if let Some(tracker) = tracker {
            tracker.set_step(ProcessStep::SpeechSynthesis);
        }
        let (voices, failed) = self.synthesize_all(chunks, &workspace, tracker).await;

        if voices.is_empty() {
            log::error!("All {} speech syntheses failed", chunks.len());
            return Err(NarrationSyncError::ExternalService(
                "no audio chunks generated".to_string(),
            ));
        }

        if let Some(tracker) = tracker {
            tracker.set_step(ProcessStep::Mixdown);
        }

        let spec = build_mix_spec(chunks, &voices, &self.music, total_duration, &self.settings);
        let report = MixReport {
            synthesized: voices.iter().map(|v| v.chunk_index).collect(),
            failed,
            voice_layers: spec.voice_tracks().count(),
            music_layers: spec.music_tracks().count(),
        };
        log::info!(
            "Mixing {} voice and {} music layers over {:.2}s",
            report.voice_layers,
            report.music_layers,
            total_duration
        );

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let file_name = format!("{}.mp3", session_id);
        let output = self.output_dir.join(&file_name);

        let rendered = tokio::time::timeout(self.render_timeout, self.renderer.render(&spec, &output)).await;
        let rendered = match rendered {
            Ok(result) => result,
            Err(_) => Err(NarrationSyncError::MixRender(format!(
                "mix rendering timed out after {:?}",
                self.render_timeout
            ))),
        };
        if let Err(e) = rendered {
            log::error!("Mix rendering failed: {}", e);
            remove_partial(&output).await;
            return Err(e);
        }

        if let Err(e) = workspace.cleanup() {
            log::warn!("Failed to remove workspace for session {}: {}", session_id, e);
        }
        if let Some(tracker) = tracker {
            tracker.update_step_progress(100.0, Some(file_name.clone()));
        }

        Ok(MixResult {
            artifact: AudioArtifact {
                url: self.public_url(&file_name),
                file_name,
                path: output,
            },
            report,
        })
    }

    /// Синтез всех фрагментов, результаты в порядке фрагментов
    async fn synthesize_all(
        &self,
        chunks: &[AudioChunk],
        workspace: &TempFileManager,
        tracker: Option<&ProgressTracker<'_>>,
    ) -> (Vec<VoiceSource>, Vec<usize>) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let mut tasks = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            let path = workspace.file_path(&format!("chunk_{}", index), "mp3");
            let semaphore = semaphore.clone();
            let synthesizer = self.synthesizer.clone();
            let text = chunk.text.clone();
            let timeout = self.synthesis_timeout;

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| NarrationSyncError::Other(format!("semaphore closed: {}", e)))?;

                let audio = tokio::time::timeout(timeout, synthesizer.synthesize(&text))
                    .await
                    .map_err(|_| {
                        NarrationSyncError::ExternalService(format!(
                            "speech synthesis timed out after {:?}",
                            timeout
                        ))
                    })??;

                tokio::fs::write(&path, &audio).await?;
                Ok::<PathBuf, NarrationSyncError>(path)
            }));
        }

        let results = join_all(tasks).await;

        let mut voices = Vec::new();
        let mut failed = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(Ok(path)) => {
                    log::debug!("Synthesized chunk {} -> {}", index, path.display());
                    voices.push(VoiceSource { chunk_index: index, path });
                }
                Ok(Err(e)) => {
                    log::warn!("Speech synthesis failed for chunk {}: {}", index, e);
                    failed.push(index);
                }
                Err(e) => {
                    log::warn!("Speech synthesis task for chunk {} panicked: {}", index, e);
                    failed.push(index);
                }
            }
        }

        if let Some(tracker) = tracker {
            tracker.update_step_progress(
                100.0,
                Some(format!("{}/{} chunks synthesized", voices.len(), chunks.len())),
            );
        }

        (voices, failed)
    }
}

async fn remove_partial(path: &Path) {
    if tokio::fs::metadata(path).await.is_ok() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            log::warn!("Failed to remove partial artifact {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use crate::audio::mix::{MixInput, MixSpec, TrackKind};

    struct FakeSynthesizer {
        fail_on: Vec<String>,
        calls: AtomicUsize,
    }

    impl FakeSynthesizer {
        fn failing_on(texts: &[&str]) -> Self {
            Self {
                fail_on: texts.iter().map(|t| t.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynthesizer {
        fn provider_name(&self) -> &str {
            "fake"
        }

        async fn synthesize(&self, text: &str) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.iter().any(|t| t == text) {
                return Err(NarrationSyncError::ExternalService("fake: 500".to_string()));
            }
            Ok(Bytes::from(format!("audio:{}", text)))
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        specs: Mutex<Vec<MixSpec>>,
        fail: bool,
    }

    #[async_trait]
    impl MixRenderer for RecordingRenderer {
        async fn render(&self, spec: &MixSpec, output: &Path) -> Result<()> {
            self.specs.lock().push(spec.clone());
            // голосовые файлы должны существовать в момент рендеринга
            for input in &spec.inputs {
                if let MixInput::File { path, looped: false } = input {
                    assert!(path.is_file(), "missing voice file {}", path.display());
                }
            }
            tokio::fs::write(output, b"mp3").await?;
            if self.fail {
                return Err(NarrationSyncError::MixRender("exit status 1".to_string()));
            }
            Ok(())
        }
    }

    /// Синтезатор, отвечающий с задержкой на заданный текст
    struct SlowSynthesizer {
        slow_text: String,
        delay: Duration,
    }

    #[async_trait]
    impl SpeechSynthesizer for SlowSynthesizer {
        fn provider_name(&self) -> &str {
            "slow"
        }

        async fn synthesize(&self, text: &str) -> Result<Bytes> {
            if text == self.slow_text {
                tokio::time::sleep(self.delay).await;
            }
            Ok(Bytes::from(format!("audio:{}", text)))
        }
    }

    /// Синтезатор, запоминающий максимум одновременных вызовов
    #[derive(Default)]
    struct ConcurrencyCounter {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for ConcurrencyCounter {
        fn provider_name(&self) -> &str {
            "counter"
        }

        async fn synthesize(&self, text: &str) -> Result<Bytes> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Bytes::from(format!("audio:{}", text)))
        }
    }

    /// Рендерер, который пишет результат и зависает
    struct HangingRenderer {
        delay: Duration,
    }

    #[async_trait]
    impl MixRenderer for HangingRenderer {
        async fn render(&self, _spec: &MixSpec, output: &Path) -> Result<()> {
            tokio::fs::write(output, b"partial").await?;
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    /// Рендерер, удаляющий рабочую директорию до очистки
    struct WorkspaceWipingRenderer;

    #[async_trait]
    impl MixRenderer for WorkspaceWipingRenderer {
        async fn render(&self, spec: &MixSpec, output: &Path) -> Result<()> {
            for input in &spec.inputs {
                if let MixInput::File { path, looped: false } = input {
                    if let Some(dir) = path.parent() {
                        if dir.exists() {
                            tokio::fs::remove_dir_all(dir).await?;
                        }
                    }
                }
            }
            tokio::fs::write(output, b"mp3").await?;
            Ok(())
        }
    }

    fn chunk(index: usize, start: f64, end: f64, text: &str) -> AudioChunk {
        AudioChunk {
            window_index: index,
            start,
            end,
            duration: end - start,
            text: text.to_string(),
            provider: "fake".to_string(),
            music_style: String::new(),
        }
    }

    fn config(root: &Path) -> NarrationSyncConfig {
        let mut config = NarrationSyncConfig::default();
        config.output_dir = root.join("out");
        config.work_dir = Some(root.join("work"));
        config.mix.music_dir = root.join("music");
        config
    }

    #[tokio::test]
    async fn test_all_failures_do_not_render() {
        let root = tempfile::tempdir().unwrap();
        let renderer = Arc::new(RecordingRenderer::default());
        let engine = AudioMixEngine::new(
            &config(root.path()),
            Arc::new(FakeSynthesizer::failing_on(&["one", "two"])),
            renderer.clone(),
        );

        let chunks = vec![chunk(0, 0.0, 2.0, "one"), chunk(1, 3.0, 5.0, "two")];
        let result = engine.mix("s1", &chunks, 10.0, None).await;

        assert!(matches!(result, Err(NarrationSyncError::ExternalService(_))));
        assert!(renderer.specs.lock().is_empty());
        assert!(!root.path().join("out").join("s1.mp3").exists());
    }

    #[tokio::test]
    async fn test_partial_success_keeps_full_length_base() {
        let root = tempfile::tempdir().unwrap();
        let renderer = Arc::new(RecordingRenderer::default());
        let synthesizer = Arc::new(FakeSynthesizer::failing_on(&["two"]));
        let engine = AudioMixEngine::new(&config(root.path()), synthesizer.clone(), renderer.clone());

        let chunks = vec![
            chunk(0, 0.0, 2.0, "one"),
            chunk(1, 3.0, 5.0, "two"),
            chunk(2, 6.0, 8.0, "three"),
        ];
        let result = engine.mix("s2", &chunks, 12.0, None).await.unwrap();

        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.report.synthesized, vec![0, 2]);
        assert_eq!(result.report.failed, vec![1]);
        assert_eq!(result.report.voice_layers, 2);
        assert_eq!(result.artifact.file_name, "s2.mp3");
        assert_eq!(result.artifact.url, "/audio/s2.mp3");
        assert!(result.artifact.path.exists());

        let specs = renderer.specs.lock();
        let spec = &specs[0];
        assert_eq!(spec.base_duration(), Some(12.0));
        let voice_chunks: Vec<usize> = spec
            .voice_tracks()
            .filter_map(|t| match t.kind {
                TrackKind::Voice { chunk_index } => Some(chunk_index),
                _ => None,
            })
            .collect();
        assert_eq!(voice_chunks, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_workspace_removed_after_mix() {
        let root = tempfile::tempdir().unwrap();
        let renderer = Arc::new(RecordingRenderer::default());
        let engine = AudioMixEngine::new(
            &config(root.path()),
            Arc::new(FakeSynthesizer::failing_on(&[])),
            renderer,
        );

        engine
            .mix("s3", &[chunk(0, 1.0, 2.0, "hello")], 5.0, None)
            .await
            .unwrap();

        let leftovers = std::fs::read_dir(root.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_render_failure_removes_partial_output() {
        let root = tempfile::tempdir().unwrap();
        let renderer = Arc::new(RecordingRenderer {
            fail: true,
            ..Default::default()
        });
        let engine = AudioMixEngine::new(
            &config(root.path()),
            Arc::new(FakeSynthesizer::failing_on(&[])),
            renderer,
        );

        let result = engine.mix("s4", &[chunk(0, 0.0, 1.0, "hi")], 3.0, None).await;

        assert!(matches!(result, Err(NarrationSyncError::MixRender(_))));
        assert!(!root.path().join("out").join("s4.mp3").exists());
        assert_eq!(std::fs::read_dir(root.path().join("work")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_slow_chunk_times_out_and_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let mut config = config(root.path());
        config.synthesis_timeout_sec = 1;
        let renderer = Arc::new(RecordingRenderer::default());
        let synthesizer = Arc::new(SlowSynthesizer {
            slow_text: "two".to_string(),
            delay: Duration::from_secs(3),
        });
        let engine = AudioMixEngine::new(&config, synthesizer, renderer.clone());

        let chunks = vec![
            chunk(0, 0.0, 2.0, "one"),
            chunk(1, 3.0, 5.0, "two"),
            chunk(2, 6.0, 8.0, "three"),
        ];
        let result = engine.mix("s5", &chunks, 10.0, None).await.unwrap();

        assert_eq!(result.report.failed, vec![1]);
        assert_eq!(result.report.synthesized, vec![0, 2]);
        assert!(result.artifact.path.exists());
        assert_eq!(renderer.specs.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_render_timeout_removes_output() {
        let root = tempfile::tempdir().unwrap();
        let mut config = config(root.path());
        config.render_timeout_sec = 1;
        let engine = AudioMixEngine::new(
            &config,
            Arc::new(FakeSynthesizer::failing_on(&[])),
            Arc::new(HangingRenderer { delay: Duration::from_secs(3) }),
        );

        let result = engine.mix("s6", &[chunk(0, 0.0, 1.0, "hi")], 3.0, None).await;

        assert!(matches!(result, Err(NarrationSyncError::MixRender(_))));
        assert!(!root.path().join("out").join("s6.mp3").exists());
    }

    #[tokio::test]
    async fn test_synthesis_respects_concurrency_limit() {
        let root = tempfile::tempdir().unwrap();
        let mut config = config(root.path());
        config.max_concurrent_requests = 2;
        let synthesizer = Arc::new(ConcurrencyCounter::default());
        let engine = AudioMixEngine::new(
            &config,
            synthesizer.clone(),
            Arc::new(RecordingRenderer::default()),
        );

        let chunks: Vec<AudioChunk> = (0..8)
            .map(|i| chunk(i, i as f64, i as f64 + 0.5, &format!("part {}", i)))
            .collect();
        let result = engine.mix("s7", &chunks, 10.0, None).await.unwrap();

        let peak = synthesizer.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak concurrency {}", peak);
        assert_eq!(result.report.synthesized.len(), 8);
        assert!(result.report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_rendered_artifact() {
        let root = tempfile::tempdir().unwrap();
        let engine = AudioMixEngine::new(
            &config(root.path()),
            Arc::new(FakeSynthesizer::failing_on(&[])),
            Arc::new(WorkspaceWipingRenderer),
        );

        let result = engine.mix("s8", &[chunk(0, 0.0, 1.0, "hi")], 3.0, None).await.unwrap();

        assert!(result.artifact.path.exists());
    }
}
