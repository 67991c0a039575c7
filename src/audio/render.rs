//! Рендеринг спецификации микса через FFmpeg
//!
//! Только этот модуль знает синтаксис filter_complex.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use async_trait::async_trait;
use tokio::process::Command;
use crate::audio::mix::{CompandParams, MixDuration, MixInput, MixSpec, TrackOp};
use crate::error::{NarrationSyncError, Result};
use crate::utils::ffmpeg::{check_ffmpeg_installed, find_ffmpeg, get_ffmpeg_version};

/// Внешний движок, исполняющий спецификацию микса
#[async_trait]
pub trait MixRenderer: Send + Sync {
    /// Отрендерить микс в файл `output`
    async fn render(&self, spec: &MixSpec, output: &Path) -> Result<()>;
}

fn format_compand(params: &CompandParams) -> String {
    let points = params
        .points
        .iter()
        .map(|(input, output)| format!("{}/{}", input, output))
        .collect::<Vec<_>>()
        .join("|");
    format!(
        "compand={a}|{a}:{d}|{d}:{points}:{knee}:{gain}:{volume}:{delay}",
        a = params.attack,
        d = params.decay,
        points = points,
        knee = params.soft_knee,
        gain = params.gain,
        volume = params.initial_volume,
        delay = params.delay,
    )
}

fn format_op(op: &TrackOp) -> String {
    match op {
        TrackOp::Trim { duration } => format!("atrim=duration={:.6}", duration),
        TrackOp::Gain { factor } => format!("volume={}", factor),
        TrackOp::Resample { sample_rate } => format!("aresample={}", sample_rate),
        TrackOp::Compand(params) => format_compand(params),
        TrackOp::Treble { gain_db } => format!("treble=g={}", gain_db),
        TrackOp::Delay { ms } => format!("adelay={}|{}", ms, ms),
    }
}

/// Построить filter_complex для спецификации
pub fn build_filter_graph(spec: &MixSpec) -> String {
    let mut parts = Vec::new();
    let mut mix_inputs = String::new();

    for (i, track) in spec.tracks.iter().enumerate() {
        if track.ops.is_empty() {
            mix_inputs.push_str(&format!("[{}]", track.input));
            continue;
        }

        let label = format!("t{}", i);
        let chain = track.ops.iter().map(format_op).collect::<Vec<_>>().join(",");
        parts.push(format!("[{}:a]{}[{}]", track.input, chain, label));
        mix_inputs.push_str(&format!("[{}]", label));
    }

    let duration = match spec.policy.duration {
        MixDuration::Longest => "longest",
        MixDuration::Shortest => "shortest",
        MixDuration::First => "first",
    };
    let amix = format!(
        "{}amix=inputs={}:duration={}:dropout_transition={}:normalize={}",
        mix_inputs,
        spec.tracks.len(),
        duration,
        spec.policy.dropout_transition,
        if spec.policy.normalize { 1 } else { 0 },
    );
    parts.push(amix);
    parts.join(";")
}

/// Построить полный список аргументов ffmpeg
pub fn build_ffmpeg_args(spec: &MixSpec, output: &Path) -> Vec<String> {
    let mut args = vec!["-y".to_string(), "-hide_banner".to_string()];

    for input in &spec.inputs {
        match input {
            MixInput::Silence { duration, sample_rate, channels } => {
                let layout = if *channels == 1 { "mono" } else { "stereo" };
                args.extend([
                    "-f".to_string(),
                    "lavfi".to_string(),
                    "-i".to_string(),
                    format!("anullsrc=r={}:cl={}:d={:.6}", sample_rate, layout, duration),
                ]);
            }
            MixInput::File { path, looped } => {
                if *looped {
                    args.extend(["-stream_loop".to_string(), "-1".to_string()]);
                }
                args.extend(["-i".to_string(), path.to_string_lossy().to_string()]);
            }
        }
    }

    args.extend([
        "-filter_complex".to_string(),
        build_filter_graph(spec),
        "-c:a".to_string(),
        "libmp3lame".to_string(),
        "-q:a".to_string(),
        "2".to_string(),
        output.to_string_lossy().to_string(),
    ]);
    args
}

/// Рендерер на основе ffmpeg
///
/// Процесс запускается с `kill_on_drop`, поэтому отмена future (например,
/// по таймауту движка) завершает ffmpeg.
pub struct FfmpegRenderer {
    ffmpeg: PathBuf,
}

impl FfmpegRenderer {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self { ffmpeg: ffmpeg.into() }
    }

    /// Найти ffmpeg по явному пути или в PATH
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        let ffmpeg = find_ffmpeg(explicit)?;
        if !check_ffmpeg_installed(&ffmpeg) {
            return Err(NarrationSyncError::Configuration(format!(
                "{} is not a working ffmpeg binary",
                ffmpeg.display()
            )));
        }
        match get_ffmpeg_version(&ffmpeg) {
            Ok(version) => log::info!("Using {}", version),
            Err(e) => log::debug!("Could not read ffmpeg version: {}", e),
        }
        Ok(Self::new(ffmpeg))
    }
}

#[async_trait]
impl MixRenderer for FfmpegRenderer {
    async fn render(&self, spec: &MixSpec, output: &Path) -> Result<()> {
        spec.check()
            .map_err(|e| NarrationSyncError::MixRender(format!("malformed mix specification: {}", e)))?;

        let args = build_ffmpeg_args(spec, output);
        log::debug!("Running {} with {} inputs", self.ffmpeg.display(), spec.inputs.len());

        let child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NarrationSyncError::MixRender(format!("failed to start ffmpeg: {}", e)))?;

        let result = child
            .wait_with_output()
            .await
            .map_err(|e| NarrationSyncError::MixRender(format!("ffmpeg failed: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            log::error!("ffmpeg failed: {}", stderr);
            return Err(NarrationSyncError::MixRender(format!(
                "ffmpeg mix error ({}): {}",
                result.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }

        Ok(())
    }
}
