// Domain models module
// Contains core data structures shared by the pipeline stages

pub mod timeline;
pub mod window;
pub mod narration;
pub mod instruction;
pub mod effect;
pub mod session;

// Экспортируем основные типы для удобства использования
pub use timeline::{ActionEvent, BoundingBox, SpeechWord, TimelineItem, Transcript, TranscriptWord};
pub use window::{Window, WindowKind};
pub use narration::{AudioChunk, Narration, NarrationSegment};
pub use instruction::ActionInstruction;
pub use effect::{DisplayEffect, EffectTarget};
pub use session::{AudioArtifact, SessionInput, SessionOutput};
