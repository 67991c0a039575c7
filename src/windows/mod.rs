//! Модуль выделения окон озвучки
//!
//! Речь группируется в сегменты по паузам между словами. Между сегментами
//! вставляются окна-заполнители, которые озвучиваются по действиям.

use crate::models::{TimelineItem, Window, WindowKind};

/// Пауза между словами, после которой начинается новый сегмент (сек)
pub const SPEECH_GAP_SEC: f64 = 0.8;
/// Минимальная длина окна-заполнителя (сек)
pub const MIN_GAP_WINDOW_SEC: f64 = 0.5;
/// Запас после последнего слова сегмента на его произнесение (сек)
pub const SPEECH_TAIL_PAD_SEC: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
struct SpeechSegment {
    start: f64,
    end: f64,
    words: usize,
}

/// Выделить окна озвучки из таймлайна
pub fn extract_windows(timeline: &[TimelineItem], total_duration: f64) -> Vec<Window> {
    let segments = group_speech(timeline);
    log::debug!("Grouped speech into {} segments", segments.len());

    let mut windows = Vec::new();
    let mut cursor = 0.0;

    for seg in &segments {
        let gap_end = seg.start.min(total_duration);
        if gap_end - cursor > MIN_GAP_WINDOW_SEC {
            windows.push(Window::new(cursor, gap_end, WindowKind::GapFill));
        }

        let end = (seg.end + SPEECH_TAIL_PAD_SEC).min(total_duration);
        if seg.start < end {
            windows.push(Window::new(seg.start, end, WindowKind::Speech));
        } else {
            log::warn!(
                "Dropping speech segment {:.2}-{:.2} ({} words) outside of video duration {:.2}",
                seg.start,
                seg.end,
                seg.words,
                total_duration
            );
        }

        cursor = seg.end + SPEECH_TAIL_PAD_SEC;
    }

    if total_duration - cursor > MIN_GAP_WINDOW_SEC {
        windows.push(Window::new(cursor, total_duration, WindowKind::GapFill));
    }

    windows
}

fn group_speech(timeline: &[TimelineItem]) -> Vec<SpeechSegment> {
    let mut segments = Vec::new();
    let mut current: Option<SpeechSegment> = None;

    for word in timeline.iter().filter_map(TimelineItem::as_speech) {
        current = match current {
            Some(mut seg) if word.time - seg.end <= SPEECH_GAP_SEC => {
                seg.end = word.time;
                seg.words += 1;
                Some(seg)
            }
            previous => {
                if let Some(seg) = previous {
                    segments.push(seg);
                }
                Some(SpeechSegment {
                    start: word.time,
                    end: word.time,
                    words: 1,
                })
            }
        };
    }

    if let Some(seg) = current {
        segments.push(seg);
    }

    segments
}
