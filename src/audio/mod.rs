//! Модуль работы с аудио: фрагменты озвучки, синтез речи, спецификация
//! микса и ее рендеринг

pub mod chunks;
pub mod engine;
pub mod mix;
pub mod render;
pub mod tts;

pub use chunks::map_narrations_to_chunks;
pub use engine::{AudioMixEngine, MixReport, MixResult};
pub use mix::{build_mix_spec, MixSpec, MusicLibrary};
pub use render::{FfmpegRenderer, MixRenderer};
pub use tts::{create_synthesizer, SpeechSynthesizer};
