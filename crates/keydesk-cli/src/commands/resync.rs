//! Resync command - Rewrite the key status registry
//!
//! Provides the `keydesk resync` CLI command. The registry trails the
//! entry log, and a write dropped after exhausting its retries leaves a
//! stale row behind. Resync requeues the full board so every key status
//! row is rewritten from current custody state.

use anyhow::Result;
use clap::Args;
use keydesk_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ResyncCommand {}

impl ResyncCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        use crate::commands::build_engine;

        let formatter = get_formatter(format);
        let engine = build_engine(config).await?;

        let queued = engine.resync().await;
        // Shutdown drains the queue, so the rewrite has landed by the
        // time we report.
        engine.shutdown().await;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({ "rewritten": queued }));
            return Ok(());
        }

        formatter.success(&format!("Rewrote {queued} key status rows from the board"));
        Ok(())
    }
}
