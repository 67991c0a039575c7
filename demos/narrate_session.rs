//! Пример обработки одной сессии записи
//!
//! Использование:
//!
//! ```text
//! NARRATION_TTS_API_KEY=... cargo run --example narrate_session -- \
//!     session.json narration.json [config.json]
//! ```
//!
//! `session.json` содержит `SessionInput`, `narration.json` массив сегментов
//! озвучки (по одному на окно). Результат печатается в stdout в формате JSON.

use anyhow::{bail, Context, Result};
use narration_sync::models::{NarrationSegment, SessionInput};
use narration_sync::progress::LogProgressObserver;
use narration_sync::utils::logger::init_logger;
use narration_sync::{NarrationSync, NarrationSyncConfig};

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Инициализируем логирование
    init_logger();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: narrate_session <session.json> <narration.json> [config.json]");
    }

    let config = match args.get(2) {
        Some(path) => NarrationSyncConfig::from_json_file(path)?,
        None => NarrationSyncConfig::default(),
    }
    .with_env_overrides();

    let session: SessionInput = read_json(&args[0])?;
    let narration: Vec<NarrationSegment> = read_json(&args[1])?;

    let mut sync = NarrationSync::from_config(config).context("failed to set up pipeline")?;
    sync.add_observer(Box::new(LogProgressObserver));

    let output = sync.process(&session, &narration).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(audio) = &output.audio {
        eprintln!("Audio written to {}", audio.path.display());
    }
    Ok(())
}
