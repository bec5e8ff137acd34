//! Status command - Show the key board
//!
//! Provides the `keydesk status` CLI command which:
//! 1. Rebuilds the in-memory board from the key status registry
//! 2. Lists every key in the configured range with its status and,
//!    for borrowed keys, the student holding it
//! 3. Supports filtering to only available or only borrowed keys

use anyhow::Result;
use clap::{Args, ValueEnum};
use keydesk_core::config::Config;
use keydesk_core::domain::KeyStatus;
use keydesk_engine::KeyStatusRow;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BoardFilter {
    All,
    Available,
    Borrowed,
}

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Which keys to list
    #[arg(long, value_enum, default_value = "all")]
    pub filter: BoardFilter,
}

impl StatusCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        use crate::commands::build_engine;

        let formatter = get_formatter(format);
        let engine = build_engine(config).await?;

        let rows = engine.list_status().await?;
        let (available, borrowed) = engine.counts();
        let range = engine.range();
        engine.shutdown().await;

        let rows = filter_rows(rows, self.filter);

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "range": range.to_string(),
                "available": available,
                "borrowed": borrowed,
                "keys": rows,
            }));
            return Ok(());
        }

        formatter.success(&format!(
            "Key board {range}: {available} available, {borrowed} borrowed"
        ));
        if rows.is_empty() {
            formatter.info("No keys match the filter.");
            return Ok(());
        }

        formatter.info("");
        formatter.info("Key    Status     Occupant");
        formatter.info("-----  ---------  --------");
        for row in &rows {
            let occupant = row
                .occupant
                .as_ref()
                .map(|s| s.as_str())
                .unwrap_or("-");
            formatter.info(&format!(
                "{:<5}  {:<9}  {}",
                row.key_id.to_string(),
                row.status.as_str(),
                occupant
            ));
        }
        Ok(())
    }
}

/// Keep only the rows matching the requested board filter
fn filter_rows(rows: Vec<KeyStatusRow>, filter: BoardFilter) -> Vec<KeyStatusRow> {
    match filter {
        BoardFilter::All => rows,
        BoardFilter::Available => rows
            .into_iter()
            .filter(|r| r.status == KeyStatus::Available)
            .collect(),
        BoardFilter::Borrowed => rows
            .into_iter()
            .filter(|r| r.status == KeyStatus::Borrowed)
            .collect(),
    }
}
