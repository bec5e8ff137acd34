//! Desk command - Interactive front desk loop
//!
//! Provides the `keydesk desk` CLI command which:
//! 1. Reads scanner tokens line by line from stdin
//! 2. Prints the desk message for each scan, keeping the session and
//!    board state across scans exactly as a wall-mounted scanner would
//! 3. Exits on EOF or Ctrl-C, draining queued registry writes first
//!
//! Rejected scans are printed and the loop keeps going; only a custody
//! consistency violation aborts the desk.

use anyhow::Result;
use clap::Args;
use keydesk_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct DeskCommand {}

impl DeskCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        use tokio::io::AsyncBufReadExt;
        use tokio_util::sync::CancellationToken;

        use crate::commands::build_engine;

        let formatter = get_formatter(format);
        let mut engine = build_engine(config).await?;

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal_token.cancel();
            }
        });

        formatter.success(&format!(
            "Front desk open on keys {} (Ctrl-D closes)",
            engine.range()
        ));

        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let token = line.trim();
                        if token.is_empty() {
                            continue;
                        }
                        match engine.handle_scan(token).await {
                            Ok(message) => formatter.success(&message),
                            Err(e) if e.is_fatal() => {
                                engine.shutdown().await;
                                return Err(e.into());
                            }
                            Err(e) => formatter.error(&e.to_string()),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        formatter.error(&format!("Failed to read scan input: {e}"));
                        break;
                    }
                },
            }
        }

        engine.shutdown().await;
        formatter.info("Desk closed.");
        Ok(())
    }
}
