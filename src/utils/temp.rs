//! Модуль для работы с временными файлами
//!
//! Каждый запрос получает собственную временную директорию, поэтому
//! одновременные запросы не пересекаются по именам файлов.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use crate::error::Result;

/// Менеджер временных файлов одного запроса
pub struct TempFileManager {
    /// Временная директория
    temp_dir: Option<TempDir>,
    /// Нужно ли удалять файлы при завершении
    cleanup: bool,
}

impl TempFileManager {
    /// Создать временную директорию `narration-<namespace>-XXXX`
    pub fn new(namespace: &str, parent: Option<&Path>, cleanup: bool) -> Result<Self> {
        let prefix = format!("narration-{}-", namespace);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let temp_dir = match parent {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)?
            }
            None => builder.tempdir()?,
        };

        Ok(Self {
            temp_dir: Some(temp_dir),
            cleanup,
        })
    }

    /// Путь для нового временного файла (сам файл не создается)
    pub fn file_path(&self, prefix: &str, extension: &str) -> PathBuf {
        let file_name = format!("{}_{}.{}", prefix, uuid::Uuid::new_v4(), extension);
        self.temp_dir_path().join(file_name)
    }

    /// Получить путь к временной директории
    pub fn temp_dir_path(&self) -> &Path {
        self.temp_dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Очистить временные файлы и директорию
    pub fn cleanup(&mut self) -> Result<()> {
        if let Some(dir) = self.temp_dir.take() {
            if self.cleanup {
                dir.close()?;
            } else {
                let kept = dir.keep();
                log::info!("Keeping temporary files in {}", kept.display());
            }
        }
        Ok(())
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        // Пытаемся очистить файлы при уничтожении объекта
        if let Err(e) = self.cleanup() {
            log::warn!("Failed to remove temporary files: {}", e);
        }
    }
}
