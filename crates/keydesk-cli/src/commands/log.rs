//! Log command - Show recent entry log rows
//!
//! Provides the `keydesk log` CLI command which:
//! 1. Queries the entry log newest-first, optionally filtered by
//!    student ID or key number
//! 2. Formats rows in a table with time, student, key, and event
//!
//! Reads go straight to the store; no engine or mirror is spun up.

use anyhow::{Context, Result};
use clap::Args;
use keydesk_core::config::Config;
use keydesk_core::domain::{EntryRecord, KeyId, StudentId};
use keydesk_core::ports::EntryFilter;
use keydesk_engine::DEFAULT_LOG_LIMIT;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct LogCommand {
    /// Maximum number of rows to show
    #[arg(long, default_value_t = DEFAULT_LOG_LIMIT)]
    pub limit: u32,

    /// Only rows for this student ID
    #[arg(long)]
    pub student: Option<String>,

    /// Only rows touching this key number
    #[arg(long)]
    pub key: Option<u32>,
}

impl LogCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        use keydesk_core::ports::IEntryStore;
        use keydesk_store::SqliteEntryStore;

        let formatter = get_formatter(format);

        let filter = log_filter(self.student.as_deref(), self.key)?;

        let store = SqliteEntryStore::open(&config.storage.db_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    config.storage.db_path.display()
                )
            })?;

        let rows = store
            .query_entries(&filter, self.limit)
            .await
            .context("Failed to read the entry log")?;

        info!(count = rows.len(), "Retrieved entry log rows");

        if matches!(format, OutputFormat::Json) {
            let entries: Vec<serde_json::Value> = rows.iter().map(entry_json).collect();
            formatter.print_json(&serde_json::json!({
                "count": rows.len(),
                "limit": self.limit,
                "entries": entries,
            }));
            return Ok(());
        }

        if rows.is_empty() {
            formatter.info("No entries recorded yet.");
            return Ok(());
        }

        formatter.success(&format!("Entry log ({} rows)", rows.len()));
        formatter.info("");
        formatter.info("Time                 Student    Key    Event");
        formatter.info("-------------------  ---------  -----  --------");
        for row in &rows {
            let key = row
                .key_id()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "-".to_string());
            let event = row.key_event().map(|e| e.as_str()).unwrap_or("-");
            formatter.info(&format!(
                "{:<19}  {:<9}  {:<5}  {}",
                row.entry_time().format("%Y-%m-%d %H:%M:%S").to_string(),
                row.student_id().as_str(),
                key,
                event
            ));
        }

        if rows.len() as u32 >= self.limit {
            formatter.info("");
            formatter.info(&format!(
                "Showing the {} most recent rows. Use --limit to see more.",
                self.limit
            ));
        }
        Ok(())
    }
}

/// Build the store filter from the command-line options
fn log_filter(student: Option<&str>, key: Option<u32>) -> Result<EntryFilter> {
    let mut filter = EntryFilter::new();
    if let Some(token) = student {
        let student_id = StudentId::new(token.to_string())
            .with_context(|| format!("Invalid student ID '{token}'"))?;
        filter = filter.with_student_id(student_id);
    }
    if let Some(number) = key {
        filter = filter.with_key_id(KeyId::new(number));
    }
    Ok(filter)
}

/// Render one log row as a JSON object
fn entry_json(row: &EntryRecord) -> serde_json::Value {
    serde_json::json!({
        "id": row.id().map(|id| id.as_i64()),
        "student_id": row.student_id().as_str(),
        "entry_time": row.entry_time().to_rfc3339(),
        "key_id": row.key_id().map(|k| k.as_u32()),
        "key_event": row.key_event().map(|e| e.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keydesk_core::domain::{EntryId, KeyEvent};

    #[test]
    fn test_log_filter_empty_by_default() {
        let filter = log_filter(None, None).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_log_filter_validates_student() {
        assert!(log_filter(Some("AB123456"), None).is_ok());
        assert!(log_filter(Some("not-a-badge"), None).is_err());
    }

    #[test]
    fn test_log_filter_accepts_key() {
        let filter = log_filter(None, Some(42)).unwrap();
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_entry_json_shapes_unclaimed_row() {
        let row = EntryRecord::new(StudentId::new("AB123456".to_string()).unwrap())
            .with_id(EntryId::new(7));

        let value = entry_json(&row);

        assert_eq!(value["id"], 7);
        assert_eq!(value["student_id"], "AB123456");
        assert_eq!(value["key_id"], serde_json::Value::Null);
        assert_eq!(value["key_event"], serde_json::Value::Null);
    }

    #[test]
    fn test_entry_json_shapes_borrow_row() {
        let row = EntryRecord::new(StudentId::new("CD789012".to_string()).unwrap())
            .with_id(EntryId::new(8))
            .with_key(KeyId::new(5), KeyEvent::Borrowed);

        let value = entry_json(&row);

        assert_eq!(value["key_id"], 5);
        assert_eq!(value["key_event"], "borrowed");
    }
}
