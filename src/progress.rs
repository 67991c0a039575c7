//! Модуль для отслеживания прогресса выполнения операций
//!
//! Реализация паттерна Observer для отслеживания прогресса обработки сессии.
//! Общий прогресс считается по весам этапов.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Информация о прогрессе выполнения операции
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап операции
    pub step: String,
    /// Процент выполнения текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий процент выполнения всей операции (0.0 - 100.0)
    pub total_progress: f32,
    /// Дополнительная информация о текущем этапе
    pub details: Option<String>,
}

impl ProgressInfo {
    /// Создает новый экземпляр ProgressInfo
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
        }
    }
}

/// Трейт для наблюдателя, получающего уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    /// Метод, вызываемый при обновлении прогресса
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Трейт для объекта, отправляющего уведомления о прогрессе
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя, возвращает его идентификатор
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>>;

    /// Уведомить всех наблюдателей о прогрессе
    fn notify_progress(&self, progress: ProgressInfo);
}

/// Реализация ProgressReporter для отслеживания прогресса
pub struct DefaultProgressReporter {
    /// Список наблюдателей
    observers: RwLock<HashMap<usize, Box<dyn ProgressObserver>>>,
    /// Счетчик для генерации уникальных идентификаторов наблюдателей
    next_id: AtomicUsize,
}

impl DefaultProgressReporter {
    /// Создать новый экземпляр DefaultProgressReporter
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.write().insert(id, observer);
        id
    }

    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        self.observers.write().remove(&id)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        for observer in self.observers.read().values() {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Наблюдатель, пишущий прогресс в лог
pub struct LogProgressObserver;

impl ProgressObserver for LogProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        log::info!(
            "[{:>5.1}%] {}: {:.0}%{}",
            progress.total_progress,
            progress.step,
            progress.step_progress,
            progress.details.map(|d| format!(" ({})", d)).unwrap_or_default()
        );
    }
}

/// Наблюдатель, сохраняющий информацию о прогрессе в памяти
#[derive(Clone, Default)]
pub struct MemoryProgressObserver {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl MemoryProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Получить историю обновлений прогресса
    pub fn history(&self) -> Vec<ProgressInfo> {
        self.history.lock().clone()
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        self.history.lock().push(progress);
    }
}

/// Этапы обработки сессии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStep {
    /// Построение таймлайна
    TimelineBuild,
    /// Выделение окон озвучки
    WindowExtraction,
    /// Получение текстов озвучки
    NarrationPlanning,
    /// Преобразование текстов в аудиофрагменты
    ChunkMapping,
    /// Синтез речи
    SpeechSynthesis,
    /// Сведение дорожек
    Mixdown,
    /// Финальная проверка
    Validation,
}

impl ProcessStep {
    /// Все этапы в порядке выполнения
    pub const ALL: [ProcessStep; 7] = [
        Self::TimelineBuild,
        Self::WindowExtraction,
        Self::NarrationPlanning,
        Self::ChunkMapping,
        Self::SpeechSynthesis,
        Self::Mixdown,
        Self::Validation,
    ];

    /// Получить название этапа в виде строки
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimelineBuild => "timeline",
            Self::WindowExtraction => "windows",
            Self::NarrationPlanning => "narration",
            Self::ChunkMapping => "chunks",
            Self::SpeechSynthesis => "synthesis",
            Self::Mixdown => "mixdown",
            Self::Validation => "validation",
        }
    }

    /// Получить весовой коэффициент этапа (в процентах от общего процесса)
    pub fn weight(&self) -> f32 {
        match self {
            Self::TimelineBuild => 2.0,
            Self::WindowExtraction => 3.0,
            Self::NarrationPlanning => 20.0,
            Self::ChunkMapping => 2.0,
            Self::SpeechSynthesis => 50.0,
            Self::Mixdown => 20.0,
            Self::Validation => 3.0,
        }
    }
}

struct TrackerState {
    current_step: ProcessStep,
    step_progress: f32,
    total_progress: f32,
    completed_steps: HashMap<ProcessStep, f32>,
}

impl TrackerState {
    fn initial() -> Self {
        Self {
            current_step: ProcessStep::TimelineBuild,
            step_progress: 0.0,
            total_progress: 0.0,
            completed_steps: HashMap::new(),
        }
    }
}

/// Трекер прогресса одного запроса.
///
/// Состояние принадлежит запросу, репортер заимствуется у владельца,
/// поэтому параллельные запросы не делят прогресс.
pub struct ProgressTracker<'a> {
    reporter: Option<&'a dyn ProgressReporter>,
    state: RwLock<TrackerState>,
}

impl<'a> ProgressTracker<'a> {
    /// Создать трекер без репортера
    pub fn new() -> Self {
        Self {
            reporter: None,
            state: RwLock::new(TrackerState::initial()),
        }
    }

    /// Создать трекер, отправляющий обновления в `reporter`
    pub fn with_reporter(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter: Some(reporter),
            state: RwLock::new(TrackerState::initial()),
        }
    }

    /// Сбросить прогресс к первому этапу
    pub fn reset(&self) {
        *self.state.write() = TrackerState::initial();
    }

    /// Установить текущий этап; предыдущий считается завершенным
    pub fn set_step(&self, step: ProcessStep) {
        {
            let mut state = self.state.write();
            if state.current_step == step {
                return;
            }
            let previous = state.current_step;
            state.completed_steps.insert(previous, 100.0);
            state.current_step = step;
            state.step_progress = 0.0;
            Self::update_total_progress(&mut state);
        }
        self.report_progress(None);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        {
            let mut state = self.state.write();
            state.step_progress = progress.clamp(0.0, 100.0);
            Self::update_total_progress(&mut state);
        }
        self.report_progress(details);
    }

    /// Общий прогресс относительно суммы весов всех этапов
    fn update_total_progress(state: &mut TrackerState) {
        let total_weight: f32 = ProcessStep::ALL.iter().map(ProcessStep::weight).sum();
        let done: f32 = ProcessStep::ALL
            .iter()
            .map(|step| {
                let progress = if *step == state.current_step {
                    state.step_progress
                } else {
                    state.completed_steps.get(step).copied().unwrap_or(0.0)
                };
                step.weight() * progress / 100.0
            })
            .sum();

        state.total_progress = (done / total_weight * 100.0).clamp(0.0, 100.0);
    }

    /// Текущий общий прогресс
    pub fn total_progress(&self) -> f32 {
        self.state.read().total_progress
    }

    fn report_progress(&self, details: Option<String>) {
        if let Some(reporter) = self.reporter {
            let progress = {
                let state = self.state.read();
                ProgressInfo::new(
                    state.current_step.as_str(),
                    state.step_progress,
                    state.total_progress,
                    details,
                )
            };
            reporter.notify_progress(progress);
        }
    }

    /// Отметить завершение всего процесса
    pub fn complete(&self) {
        {
            let mut state = self.state.write();
            let current = state.current_step;
            state.completed_steps.insert(current, 100.0);
            state.step_progress = 100.0;
            state.total_progress = 100.0;
        }
        self.report_progress(Some("completed".to_string()));
    }
}

impl Default for ProgressTracker<'_> {
    fn default() -> Self {
        Self::new()
    }
}
