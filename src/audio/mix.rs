//! Декларативная спецификация многодорожечного микса
//!
//! Спецификация собирается в памяти и ничего не знает о синтаксисе конкретного
//! рендерера. Перевод в аргументы ffmpeg живет в модуле `render`.

use std::collections::HashMap;
use std::path::PathBuf;
use crate::config::MixSettings;
use crate::models::AudioChunk;

/// Источник звука для микса
#[derive(Debug, Clone, PartialEq)]
pub enum MixInput {
    /// Тишина заданной длительности
    Silence {
        duration: f64,
        sample_rate: u32,
        channels: u8,
    },
    /// Аудиофайл, при `looped` повторяется бесконечно
    File { path: PathBuf, looped: bool },
}

/// Параметры компрессора/лимитера
#[derive(Debug, Clone, PartialEq)]
pub struct CompandParams {
    pub attack: f32,
    pub decay: f32,
    /// Точки передаточной кривой (вход дБ, выход дБ)
    pub points: Vec<(f32, f32)>,
    pub soft_knee: f32,
    pub gain: f32,
    pub initial_volume: f32,
    pub delay: f32,
}

impl CompandParams {
    /// Кривая "вещательного" голоса: поднимает тихие места, плотнее звучит
    pub fn broadcast_voice() -> Self {
        Self {
            attack: 0.3,
            decay: 1.0,
            points: vec![(-90.0, -60.0), (-60.0, -40.0), (-40.0, -30.0), (-20.0, -20.0)],
            soft_knee: 6.0,
            gain: 0.0,
            initial_volume: -90.0,
            delay: 0.2,
        }
    }
}

/// Операция над дорожкой
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOp {
    /// Обрезать до длительности (сек)
    Trim { duration: f64 },
    /// Умножить громкость
    Gain { factor: f32 },
    /// Передискретизация
    Resample { sample_rate: u32 },
    /// Компрессор
    Compand(CompandParams),
    /// Подъем высоких частот (дБ)
    Treble { gain_db: f32 },
    /// Задержка начала (мс), на всех каналах
    Delay { ms: u64 },
}

/// Назначение дорожки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Base,
    Voice { chunk_index: usize },
    Music { chunk_index: usize },
}

/// Одна дорожка микса: ссылка на источник и цепочка операций
#[derive(Debug, Clone, PartialEq)]
pub struct MixTrack {
    pub input: usize,
    pub kind: TrackKind,
    pub ops: Vec<TrackOp>,
}

impl MixTrack {
    /// Длительность обрезки, если есть
    pub fn trim_duration(&self) -> Option<f64> {
        self.ops.iter().find_map(|op| match op {
            TrackOp::Trim { duration } => Some(*duration),
            _ => None,
        })
    }

    /// Задержка начала, если есть
    pub fn delay_ms(&self) -> Option<u64> {
        self.ops.iter().find_map(|op| match op {
            TrackOp::Delay { ms } => Some(*ms),
            _ => None,
        })
    }

    /// Итоговый множитель громкости
    pub fn gain(&self) -> f32 {
        self.ops
            .iter()
            .filter_map(|op| match op {
                TrackOp::Gain { factor } => Some(*factor),
                _ => None,
            })
            .product()
    }
}

/// Какая дорожка определяет длительность результата
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixDuration {
    Longest,
    Shortest,
    First,
}

/// Правила сведения
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixdownPolicy {
    pub duration: MixDuration,
    /// Время затухания при окончании короткой дорожки (сек)
    pub dropout_transition: f64,
    pub normalize: bool,
}

impl Default for MixdownPolicy {
    fn default() -> Self {
        Self {
            duration: MixDuration::Longest,
            dropout_transition: 0.0,
            normalize: false,
        }
    }
}

/// Полная спецификация микса
#[derive(Debug, Clone, PartialEq)]
pub struct MixSpec {
    pub inputs: Vec<MixInput>,
    pub tracks: Vec<MixTrack>,
    pub policy: MixdownPolicy,
}

impl MixSpec {
    pub fn voice_tracks(&self) -> impl Iterator<Item = &MixTrack> {
        self.tracks.iter().filter(|t| matches!(t.kind, TrackKind::Voice { .. }))
    }

    pub fn music_tracks(&self) -> impl Iterator<Item = &MixTrack> {
        self.tracks.iter().filter(|t| matches!(t.kind, TrackKind::Music { .. }))
    }

    /// Длительность базовой дорожки тишины
    pub fn base_duration(&self) -> Option<f64> {
        let base = self.tracks.iter().find(|t| t.kind == TrackKind::Base)?;
        match self.inputs.get(base.input)? {
            MixInput::Silence { duration, .. } => Some(*duration),
            MixInput::File { .. } => None,
        }
    }

    /// Проверить, что все дорожки ссылаются на существующие источники
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.tracks.is_empty() {
            return Err("mix has no tracks".to_string());
        }
        for (i, track) in self.tracks.iter().enumerate() {
            if track.input >= self.inputs.len() {
                return Err(format!("track {} references missing input {}", i, track.input));
            }
            if let Some(duration) = track.trim_duration() {
                if !(duration > 0.0) || !duration.is_finite() {
                    return Err(format!("track {} has invalid trim duration {}", i, duration));
                }
            }
        }
        Ok(())
    }
}

/// Фрагмент, для которого удалось синтезировать речь
#[derive(Debug, Clone)]
pub struct VoiceSource {
    pub chunk_index: usize,
    pub path: PathBuf,
}

/// Найти файлы фоновой музыки по стилю: `<music_dir>/<style>.mp3`
#[derive(Debug, Clone)]
pub struct MusicLibrary {
    dir: PathBuf,
    default_style: String,
}

impl MusicLibrary {
    pub fn new(dir: impl Into<PathBuf>, default_style: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            default_style: default_style.into(),
        }
    }

    pub fn from_settings(settings: &MixSettings) -> Self {
        Self::new(settings.music_dir.clone(), settings.default_music_style.clone())
    }

    /// Стиль с учетом значения по умолчанию
    pub fn resolve_style<'a>(&'a self, style: &'a str) -> &'a str {
        let style = style.trim();
        if style.is_empty() {
            &self.default_style
        } else {
            style
        }
    }

    /// Путь к треку стиля, если файл существует
    pub fn lookup(&self, style: &str) -> Option<PathBuf> {
        let style = self.resolve_style(style);
        if style.contains(['/', '\\']) || style.starts_with('.') {
            log::warn!("Ignoring suspicious music style name: {}", style);
            return None;
        }
        let path = self.dir.join(format!("{}.mp3", style));
        path.is_file().then_some(path)
    }
}

fn delay_ms(start: f64) -> u64 {
    (start * 1000.0).round().max(0.0) as u64
}

/// Предел звучания голоса фрагмента: до начала следующего фрагмента плюс запас,
/// для последнего до конца видео плюс запас. Не меньше номинальной длительности.
///
/// `None`, если фрагмента с индексом `index` нет.
pub fn voice_duration_limit(
    chunks: &[AudioChunk],
    index: usize,
    total_duration: f64,
    padding: f64,
) -> Option<f64> {
    let chunk = chunks.get(index)?;
    let limit = match chunks.get(index + 1) {
        Some(next) if next.start > chunk.start => next.start - chunk.start + padding,
        _ => total_duration - chunk.start + padding,
    };
    Some(limit.max(chunk.end - chunk.start))
}

/// Длительность фоновой музыки фрагмента: до начала следующего фрагмента,
/// для последнего собственный интервал фрагмента.
pub fn music_layer_duration(chunks: &[AudioChunk], index: usize) -> Option<f64> {
    let chunk = chunks.get(index)?;
    let duration = match chunks.get(index + 1) {
        Some(next) if next.start > chunk.start => next.start - chunk.start,
        _ => chunk.end - chunk.start,
    };
    Some(duration)
}

/// Собрать спецификацию микса.
///
/// `voices` только для успешно синтезированных фрагментов, в порядке фрагментов.
/// Соседи для расчета пределов берутся из полного списка `chunks`.
pub fn build_mix_spec(
    chunks: &[AudioChunk],
    voices: &[VoiceSource],
    music: &MusicLibrary,
    total_duration: f64,
    settings: &MixSettings,
) -> MixSpec {
    let mut inputs = vec![MixInput::Silence {
        duration: total_duration,
        sample_rate: settings.sample_rate,
        channels: 2,
    }];
    let mut tracks = vec![MixTrack {
        input: 0,
        kind: TrackKind::Base,
        ops: Vec::new(),
    }];

    for voice in voices {
        let (Some(chunk), Some(limit)) = (
            chunks.get(voice.chunk_index),
            voice_duration_limit(chunks, voice.chunk_index, total_duration, settings.voice_padding_sec),
        ) else {
            log::warn!("Skipping voice source for unknown chunk {}", voice.chunk_index);
            continue;
        };

        inputs.push(MixInput::File { path: voice.path.clone(), looped: false });
        tracks.push(MixTrack {
            input: inputs.len() - 1,
            kind: TrackKind::Voice { chunk_index: voice.chunk_index },
            ops: vec![
                TrackOp::Trim { duration: limit },
                TrackOp::Gain { factor: settings.voice_gain },
                TrackOp::Resample { sample_rate: settings.sample_rate },
                TrackOp::Compand(CompandParams::broadcast_voice()),
                TrackOp::Treble { gain_db: settings.treble_gain_db },
                TrackOp::Delay { ms: delay_ms(chunk.start) },
            ],
        });
    }

    // один зацикленный источник на стиль
    let mut music_inputs: HashMap<PathBuf, usize> = HashMap::new();
    for (index, chunk) in chunks.iter().enumerate() {
        let Some(path) = music.lookup(&chunk.music_style) else {
            log::debug!(
                "No background music for style '{}' (chunk {})",
                music.resolve_style(&chunk.music_style),
                index
            );
            continue;
        };

        let Some(duration) = music_layer_duration(chunks, index) else {
            continue;
        };
        if duration <= settings.min_music_layer_sec {
            continue;
        }

        let input = *music_inputs.entry(path.clone()).or_insert_with(|| {
            inputs.push(MixInput::File { path, looped: true });
            inputs.len() - 1
        });

        tracks.push(MixTrack {
            input,
            kind: TrackKind::Music { chunk_index: index },
            ops: vec![
                TrackOp::Trim { duration },
                TrackOp::Gain { factor: settings.music_gain },
                TrackOp::Delay { ms: delay_ms(chunk.start) },
            ],
        });
    }

    MixSpec {
        inputs,
        tracks,
        policy: MixdownPolicy::default(),
    }
}
