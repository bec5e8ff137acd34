//! CLI command implementations.
//!
//! Every command runs against the same wiring: configuration resolves the
//! database path and key range, the store opens over SQLite, and commands
//! that mutate custody state go through a [`CustodyEngine`] so the entry
//! log, the in-memory board, and the key status registry stay in step.

pub mod desk;
pub mod log;
pub mod resync;
pub mod scan;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use keydesk_core::config::Config;
use keydesk_engine::{CustodyEngine, MirrorWriter};
use keydesk_store::SqliteEntryStore;

/// Loads the configuration from an explicit `--config` path or the default
/// location. An explicit path must exist; the default location falls back
/// to built-in defaults when the file is absent.
pub fn load_config(config_override: Option<&str>) -> Result<Config> {
    let config = match config_override {
        Some(path) => {
            let path = Path::new(path);
            Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => Config::load_or_default(&Config::default_path()),
    };

    let problems = config.validate();
    if !problems.is_empty() {
        let rendered = problems
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("Invalid configuration: {rendered}");
    }

    Ok(config)
}

/// Opens the configured database and assembles a custody engine with its
/// mirror writer attached. Callers own the engine and must call
/// [`CustodyEngine::shutdown`] to drain pending registry writes.
pub async fn build_engine(config: &Config) -> Result<CustodyEngine> {
    let range = config
        .keys
        .range()
        .context("Invalid key range in configuration")?;
    let store = SqliteEntryStore::open(&config.storage.db_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open database at {}",
                config.storage.db_path.display()
            )
        })?;
    let store = Arc::new(store);
    let mirror = MirrorWriter::spawn(store.clone(), &config.mirror);
    let engine = CustodyEngine::new(store, mirror, range)
        .await
        .context("Failed to initialize custody engine")?;
    Ok(engine)
}
