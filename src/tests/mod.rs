// Тесты полного цикла обработки сессии с подставными синтезатором и рендерером

use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use crate::audio::{MixRenderer, MixSpec, SpeechSynthesizer};
use crate::models::{
    ActionEvent, BoundingBox, NarrationSegment, SessionInput, Transcript, TranscriptWord,
};
use crate::progress::MemoryProgressObserver;
use crate::validate::ValidationError;
use crate::{NarrationSource, NarrationSync, NarrationSyncConfig, NarrationSyncError};

struct EchoSynthesizer {
    fail_all: bool,
}

#[async_trait]
impl SpeechSynthesizer for EchoSynthesizer {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn synthesize(&self, text: &str) -> crate::Result<Bytes> {
        if self.fail_all {
            return Err(NarrationSyncError::ExternalService("echo: 503".to_string()));
        }
        Ok(Bytes::from(text.as_bytes().to_vec()))
    }
}

#[derive(Default)]
struct FileRenderer {
    rendered: Mutex<Vec<MixSpec>>,
}

#[async_trait]
impl MixRenderer for FileRenderer {
    async fn render(&self, spec: &MixSpec, output: &Path) -> crate::Result<()> {
        self.rendered.lock().push(spec.clone());
        tokio::fs::write(output, b"ID3").await?;
        Ok(())
    }
}

fn word(text: &str, start: f64) -> TranscriptWord {
    TranscriptWord {
        word: text.to_lowercase(),
        start,
        end: start + 0.25,
        confidence: 0.98,
        punctuated_word: text.to_string(),
    }
}

fn session(session_id: &str, duration: f64) -> SessionInput {
    SessionInput {
        session_id: session_id.to_string(),
        video_duration_sec: duration,
        transcript: Some(Transcript {
            words: vec![word("Hello", 0.0), word("and", 0.3), word("welcome.", 0.6)],
        }),
        actions: vec![ActionEvent::new(2.0, "click")
            .with_bounds(BoundingBox { x: 40.0, y: 80.0, width: 120.0, height: 32.0 })],
    }
}

fn segment(start: f64, end: f64, text: &str) -> NarrationSegment {
    NarrationSegment {
        start,
        end,
        text: text.to_string(),
        music_style: String::new(),
    }
}

fn pipeline(root: &Path, fail_all: bool) -> (NarrationSync, Arc<FileRenderer>) {
    let mut config = NarrationSyncConfig::default();
    config.output_dir = root.join("audio");
    config.work_dir = Some(root.join("work"));
    config.mix.music_dir = root.join("music");

    let renderer = Arc::new(FileRenderer::default());
    let sync = NarrationSync::new(config, Arc::new(EchoSynthesizer { fail_all }), renderer.clone());
    (sync, renderer)
}

#[tokio::test]
async fn test_full_session() {
    let root = tempfile::tempdir().unwrap();
    let (sync, renderer) = pipeline(root.path(), false);
    let narration = vec![
        segment(0.0, 0.8, "Welcome to the demo."),
        segment(1.0, 9.0, "Now we save the form!"),
    ];

    let output = sync.process(&session("demo-1", 10.0), &narration).await.unwrap();

    assert_eq!(output.windows.len(), 2);
    assert_eq!(output.windows[0].start, 0.0);
    assert!((output.windows[0].end - 0.9).abs() < 1e-9);
    assert!((output.windows[1].start - 0.9).abs() < 1e-9);
    assert_eq!(output.windows[1].end, 10.0);
    assert_eq!(output.audio_chunks.len(), 2);
    assert_eq!(output.audio_chunks[1].provider, "echo");
    assert_eq!(output.instructions.len(), 1);
    assert_eq!(output.display_effects.len(), 1);
    assert_eq!(output.display_effects[0].effect_type, "highlight");

    let audio = output.audio.as_ref().unwrap();
    assert_eq!(audio.url, "/audio/demo-1.mp3");
    assert!(audio.path.exists());

    let specs = renderer.rendered.lock();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].base_duration(), Some(10.0));
    assert_eq!(specs[0].voice_tracks().count(), 2);

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["sessionId"], "demo-1");
    assert_eq!(json["audio"]["url"], "/audio/demo-1.mp3");
    assert!(json["audioChunks"].is_array());
    assert!(json["displayEffects"].is_array());
}

#[tokio::test]
async fn test_rejects_bad_input() {
    let root = tempfile::tempdir().unwrap();
    let (sync, renderer) = pipeline(root.path(), false);
    let narration: Vec<NarrationSegment> = Vec::new();

    for input in [
        session("", 10.0),
        session("../etc", 10.0),
        session("ok", 0.0),
        session("ok", f64::NAN),
        session("ok", 3600.5),
    ] {
        let result = sync.process(&input, &narration).await;
        assert!(matches!(result, Err(NarrationSyncError::Input(_))), "{:?}", input.session_id);
    }

    let mut negative = session("ok", 10.0);
    negative.actions.push(ActionEvent::new(-1.0, "click"));
    assert!(matches!(
        sync.process(&negative, &narration).await,
        Err(NarrationSyncError::Input(_))
    ));
    assert!(renderer.rendered.lock().is_empty());
}

#[tokio::test]
async fn test_validation_failure_removes_artifact() {
    let root = tempfile::tempdir().unwrap();
    let (sync, renderer) = pipeline(root.path(), false);
    // первый сегмент выходит за окно [0, 0.9]
    let narration = vec![segment(0.0, 2.0, "Too long for the window.")];

    let result = sync.process(&session("demo-2", 10.0), &narration).await;

    assert!(matches!(
        result,
        Err(NarrationSyncError::Validation(ValidationError::NarrationOutOfBounds { .. }))
    ));
    assert_eq!(renderer.rendered.lock().len(), 1);
    assert!(!root.path().join("audio").join("demo-2.mp3").exists());
}

#[tokio::test]
async fn test_empty_narration_skips_audio() {
    let root = tempfile::tempdir().unwrap();
    let (sync, renderer) = pipeline(root.path(), false);
    let narration = vec![segment(0.0, 0.8, "   "), segment(1.0, 9.0, "")];

    let output = sync.process(&session("demo-3", 10.0), &narration).await.unwrap();

    assert!(output.audio.is_none());
    assert!(output.audio_chunks.is_empty());
    assert_eq!(output.narrations.len(), 2);
    assert!(renderer.rendered.lock().is_empty());
}

#[tokio::test]
async fn test_all_syntheses_failing_is_external_error() {
    let root = tempfile::tempdir().unwrap();
    let (sync, renderer) = pipeline(root.path(), true);
    let narration = vec![segment(0.0, 0.8, "Welcome."), segment(1.0, 9.0, "Click save.")];

    let result = sync.process(&session("demo-4", 10.0), &narration).await;

    assert!(matches!(result, Err(NarrationSyncError::ExternalService(_))));
    assert!(renderer.rendered.lock().is_empty());
    assert!(!root.path().join("audio").join("demo-4.mp3").exists());
}

#[tokio::test]
async fn test_progress_reaches_completion() {
    let root = tempfile::tempdir().unwrap();
    let (mut sync, _) = pipeline(root.path(), false);
    let observer = MemoryProgressObserver::new();
    sync.add_observer(Box::new(observer.clone()));

    let narration = vec![segment(0.0, 0.8, "Welcome.")];
    sync.process(&session("demo-5", 10.0), &narration).await.unwrap();

    let history = observer.history();
    assert!(history.iter().any(|p| p.step == "synthesis"));
    let last = history.last().unwrap();
    assert_eq!(last.step, "validation");
    assert_eq!(last.total_progress, 100.0);
}

#[tokio::test]
async fn test_progress_restarts_for_each_session() {
    let root = tempfile::tempdir().unwrap();
    let (mut sync, _) = pipeline(root.path(), false);
    let observer = MemoryProgressObserver::new();
    sync.add_observer(Box::new(observer.clone()));
    let narration = vec![segment(0.0, 0.8, "Welcome.")];

    sync.process(&session("demo-7a", 10.0), &narration).await.unwrap();
    let first_run = observer.history().len();
    sync.process(&session("demo-7b", 10.0), &narration).await.unwrap();

    let history = observer.history();
    let second = &history[first_run..];
    assert!(second[0].total_progress < 50.0, "{:?}", second[0]);
    assert_eq!(second[0].step, "windows");
    assert_eq!(second.last().unwrap().total_progress, 100.0);
}

#[test]
fn test_prepare_actions_follow_timeline_order() {
    let root = tempfile::tempdir().unwrap();
    let (sync, _) = pipeline(root.path(), false);
    let mut input = session("demo-6", 10.0);
    input.actions = vec![ActionEvent::new(5.0, "hover"), ActionEvent::new(1.0, "click")];

    let plan = sync.prepare(&input).unwrap();
    let times: Vec<f64> = plan.actions().iter().map(|a| a.time).collect();
    assert_eq!(times, vec![1.0, 5.0]);
}

#[test]
fn test_static_narration_source_returns_segments() {
    let segments = vec![segment(0.0, 1.0, "Intro.")];
    let source: &dyn NarrationSource = &segments;

    let result = tokio_test::block_on(source.narrate(&[], &[], 10.0)).unwrap();
    assert_eq!(result, segments);
}
