//! Scan command - Process scanner tokens one-shot
//!
//! Provides the `keydesk scan` CLI command which:
//! 1. Feeds each token to the custody engine in argument order
//! 2. Prints the desk message for accepted scans and the reason for
//!    rejected ones, without stopping at the first rejection
//! 3. Drains queued registry writes before the process exits
//!
//! A badge scan opens a session that lasts for the rest of the
//! invocation, so `keydesk scan AB123456 5` checks key 5 out to
//! student AB123456 in one call.

use anyhow::Result;
use clap::Args;
use keydesk_core::config::Config;
use keydesk_core::domain::CustodyError;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Scanner tokens, badge or key, auto-detected
    #[arg(required = true)]
    pub tokens: Vec<String>,
}

impl ScanCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        use crate::commands::build_engine;

        let formatter = get_formatter(format);
        let mut engine = build_engine(config).await?;

        let mut outcomes: Vec<(String, Result<String, CustodyError>)> =
            Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            match engine.handle_scan(token).await {
                // A fatal error means custody state is inconsistent; stop
                // feeding scans and surface it.
                Err(e) if e.is_fatal() => {
                    engine.shutdown().await;
                    return Err(e.into());
                }
                outcome => outcomes.push((token.clone(), outcome)),
            }
        }
        engine.shutdown().await;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&scan_report(&outcomes));
            return Ok(());
        }

        for (_, outcome) in &outcomes {
            match outcome {
                Ok(message) => formatter.success(message),
                Err(e) => formatter.error(&e.to_string()),
            }
        }
        Ok(())
    }
}

/// Render per-token outcomes as a JSON report
fn scan_report(outcomes: &[(String, Result<String, CustodyError>)]) -> serde_json::Value {
    let scans: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|(token, outcome)| match outcome {
            Ok(message) => serde_json::json!({
                "token": token,
                "accepted": true,
                "message": message,
            }),
            Err(e) => serde_json::json!({
                "token": token,
                "accepted": false,
                "error": e.to_string(),
            }),
        })
        .collect();
    let rejected = outcomes.iter().filter(|(_, o)| o.is_err()).count();

    serde_json::json!({
        "scans": scans,
        "accepted": outcomes.len() - rejected,
        "rejected": rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_report_counts_outcomes() {
        let outcomes = vec![
            ("AB123456".to_string(), Ok("Student AB123456 entered the library.".to_string())),
            ("5".to_string(), Ok("Key 5 borrowed by student AB123456.".to_string())),
            ("7".to_string(), Err(CustodyError::NoSession)),
        ];

        let report = scan_report(&outcomes);

        assert_eq!(report["accepted"], 2);
        assert_eq!(report["rejected"], 1);
        assert_eq!(report["scans"].as_array().unwrap().len(), 3);
        assert_eq!(report["scans"][0]["accepted"], true);
        assert_eq!(report["scans"][2]["accepted"], false);
        assert_eq!(
            report["scans"][2]["error"],
            "No student ID scanned. Please scan a student ID first."
        );
    }

    #[test]
    fn test_scan_report_empty() {
        let report = scan_report(&[]);
        assert_eq!(report["accepted"], 0);
        assert_eq!(report["rejected"], 0);
    }
}
