//! Модуль построения канонического таймлайна
//!
//! Объединяет слова из распознавания речи и действия пользователя в одну
//! последовательность, упорядоченную по времени.

use std::cmp::Ordering;
use crate::error::{NarrationSyncError, Result};
use crate::models::{ActionEvent, SpeechWord, TimelineItem, Transcript};

/// Построить таймлайн из слов и действий.
///
/// Сортировка стабильная. При равном времени речь идет раньше действия,
/// внутри одного вида сохраняется порядок добавления.
pub fn build_timeline(transcript: Option<&Transcript>, actions: Vec<ActionEvent>) -> Vec<TimelineItem> {
    let mut timeline: Vec<TimelineItem> = transcript
        .map(|t| {
            t.words
                .iter()
                .map(|w| TimelineItem::Speech(SpeechWord::from(w)))
                .collect()
        })
        .unwrap_or_default();

    timeline.extend(actions.into_iter().map(TimelineItem::Action));
    timeline.sort_by(compare_items);

    log::debug!("Built timeline with {} items", timeline.len());
    timeline
}

fn compare_items(a: &TimelineItem, b: &TimelineItem) -> Ordering {
    a.time()
        .total_cmp(&b.time())
        .then_with(|| kind_rank(a).cmp(&kind_rank(b)))
}

fn kind_rank(item: &TimelineItem) -> u8 {
    match item {
        TimelineItem::Speech(_) => 0,
        TimelineItem::Action(_) => 1,
    }
}

/// Проверить, что все времена таймлайна конечны и неотрицательны
pub fn check_timeline(timeline: &[TimelineItem]) -> Result<()> {
    for (i, item) in timeline.iter().enumerate() {
        let t = item.time();
        if !t.is_finite() {
            return Err(NarrationSyncError::input("timeline", format!("item {} has non-finite time", i)));
        }
        if t < 0.0 {
            return Err(NarrationSyncError::input(
                "timeline",
                format!("item {} has negative time {:.2}", i, t),
            ));
        }
    }
    Ok(())
}
