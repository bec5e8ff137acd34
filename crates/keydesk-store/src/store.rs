//! SQLite implementation of IEntryStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! entry store port defined in keydesk-core: connection setup, schema
//! preparation, domain type serialization/deserialization, and SQL query
//! construction.
//!
//! ## Type Mapping
//!
//! | Domain Type   | SQL Type | Strategy                                     |
//! |---------------|----------|----------------------------------------------|
//! | StudentId     | TEXT     | Badge string via `.as_str()` / `StudentId::new()` |
//! | EntryId       | INTEGER  | Row ID via `.as_i64()` / `EntryId::new()`    |
//! | KeyId         | INTEGER  | Key number via `.as_u32()` / `KeyId::new()`  |
//! | KeyEvent      | TEXT     | `"borrowed"` / `"returned"` via `.as_str()` / `FromStr` |
//! | KeyStatus     | TEXT     | `"available"` / `"borrowed"` via `.as_str()` / `FromStr` |
//! | DateTime<Utc> | TEXT     | ISO 8601 via `to_rfc3339()` / `DateTime::parse_from_rfc3339()` |

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use keydesk_core::domain::{
    entry::{EntryRecord, KeyEvent},
    key::{KeyRange, KeyStatus},
    newtypes::{EntryId, KeyId, StudentId},
};
use keydesk_core::ports::{EntryFilter, IEntryStore, KeyFieldFilter};

use crate::StoreError;

/// Schema applied to every database this store opens. `IF NOT EXISTS`
/// guards make it safe to run on each open.
const SCHEMA: &str = include_str!("migrations/20260810_initial.sql");

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based implementation of the entry store port
///
/// Provides persistent storage for the entry log and key status registry.
/// Desk deployments open a database file with [`SqliteEntryStore::open`];
/// tests get an isolated throwaway database from
/// [`SqliteEntryStore::in_memory`]. Either way the schema is prepared
/// before the store is handed out.
pub struct SqliteEntryStore {
    pool: SqlitePool,
}

impl SqliteEntryStore {
    /// Opens the database file at `db_path`, creating the file, its parent
    /// directories and the schema as needed.
    ///
    /// The connection runs in WAL journal mode so the `log` and `status`
    /// read paths never block a desk writing scans, with a busy timeout
    /// to ride out short write contention.
    ///
    /// # Errors
    /// Returns `StoreError::ConnectionFailed` when the file or directory
    /// cannot be opened, `StoreError::MigrationFailed` when the schema
    /// cannot be prepared.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Cannot create {} for the database: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Cannot open database {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        let store = Self::prepare(pool).await?;
        tracing::info!(path = %db_path.display(), "Entry store opened");
        Ok(store)
    }

    /// Opens a private in-memory database, used by tests.
    ///
    /// Capped at one connection: an in-memory SQLite database lives and
    /// dies with its connection, so a pool of several would see several
    /// unrelated databases.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Cannot open in-memory database: {}", e))
            })?;

        Self::prepare(pool).await
    }

    /// Runs the schema over a fresh pool and wraps it.
    async fn prepare(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Schema setup failed: {}", e)))?;

        Ok(Self { pool })
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Deserialize a KeyStatus from its stored string representation
fn key_status_from_string(s: &str) -> Result<KeyStatus, StoreError> {
    s.parse()
        .map_err(|_| StoreError::SerializationError(format!("Unknown key status: {}", s)))
}

/// Deserialize a KeyEvent from its stored string representation
fn key_event_from_string(s: &str) -> Result<KeyEvent, StoreError> {
    s.parse()
        .map_err(|_| StoreError::SerializationError(format!("Unknown key event: {}", s)))
}

/// Convert a stored key_id column value to a KeyId
fn key_id_from_i64(value: i64) -> Result<KeyId, StoreError> {
    u32::try_from(value)
        .map(KeyId::new)
        .map_err(|_| StoreError::SerializationError(format!("Key ID out of range: {}", value)))
}

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Try parsing without timezone (SQLite default format)
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct an EntryRecord from a database row
///
/// The key fields are either both set or both NULL; a row with only one
/// of them set is corrupt and rejected.
fn entry_from_row(row: &SqliteRow) -> Result<EntryRecord, StoreError> {
    let id: i64 = row.get("id");
    let student_id_str: String = row.get("student_id");
    let entry_time_str: String = row.get("entry_time");
    let key_id: Option<i64> = row.get("key_id");
    let key_event_str: Option<String> = row.get("key_event");

    let student_id = StudentId::new(student_id_str)
        .map_err(|e| StoreError::SerializationError(format!("Bad student ID in row {}: {}", id, e)))?;
    let entry_time = parse_datetime(&entry_time_str)?;

    let record = EntryRecord::new(student_id)
        .with_id(EntryId::new(id))
        .with_entry_time(entry_time);

    match (key_id, key_event_str) {
        (Some(key), Some(ref event)) => {
            Ok(record.with_key(key_id_from_i64(key)?, key_event_from_string(event)?))
        }
        (None, None) => Ok(record),
        (key, event) => Err(StoreError::SerializationError(format!(
            "Half-set key fields in row {}: key_id={:?}, key_event={:?}",
            id, key, event
        ))),
    }
}

// ============================================================================
// IEntryStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IEntryStore for SqliteEntryStore {
    // --- Entry log operations ---

    async fn append_entry(
        &self,
        student_id: &StudentId,
        entry_time: DateTime<Utc>,
    ) -> anyhow::Result<EntryId> {
        let entry_time_str = entry_time.to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO entries (student_id, entry_time) \
             VALUES (?, ?)",
        )
        .bind(student_id.as_str())
        .bind(&entry_time_str)
        .execute(&self.pool)
        .await?;

        let id = EntryId::new(result.last_insert_rowid());
        tracing::trace!(entry_id = %id, student_id = %student_id, "Appended entry");
        Ok(id)
    }

    async fn update_entry_key(
        &self,
        id: EntryId,
        key_id: KeyId,
        event: KeyEvent,
    ) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE entries SET key_id = ?, key_event = ? \
             WHERE id = ?",
        )
        .bind(key_id.as_u32() as i64)
        .bind(event.as_str())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("No entry row with id {} to update", id);
        }

        tracing::trace!(entry_id = %id, key_id = %key_id, event = %event, "Updated entry key fields");
        Ok(())
    }

    async fn query_entries(
        &self,
        filter: &EntryFilter,
        limit: u32,
    ) -> anyhow::Result<Vec<EntryRecord>> {
        let mut sql = String::from("SELECT * FROM entries WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref student_id) = filter.student_id {
            sql.push_str(" AND student_id = ?");
            binds.push(student_id.as_str().to_string());
        }

        if let Some(ref key_id) = filter.key_id {
            sql.push_str(" AND key_id = ?");
            binds.push(key_id.as_u32().to_string());
        }

        match filter.key_field {
            Some(KeyFieldFilter::Event(event)) => {
                sql.push_str(" AND key_event = ?");
                binds.push(event.as_str().to_string());
            }
            Some(KeyFieldFilter::Unclaimed) => {
                sql.push_str(" AND (key_event IS NULL OR key_event = 'returned')");
            }
            None => {}
        }

        sql.push_str(" ORDER BY entry_time DESC, id DESC LIMIT ?");

        // Build the query dynamically
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        query = query.bind(limit as i64);

        let rows = query.fetch_all(&self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(entry_from_row(row)?);
        }

        Ok(entries)
    }

    // --- Key registry operations ---

    async fn seed_key_range(&self, range: &KeyRange) -> anyhow::Result<()> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM key_status")
            .fetch_one(&self.pool)
            .await?;

        if existing > 0 {
            tracing::debug!(rows = existing, "Key registry already seeded, leaving as-is");
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for key in range.iter() {
            sqlx::query("INSERT INTO key_status (key_id, status) VALUES (?, ?)")
                .bind(key.as_u32() as i64)
                .bind(KeyStatus::Available.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(range = %range, "Seeded key registry");
        Ok(())
    }

    async fn upsert_key_status(&self, key_id: KeyId, status: KeyStatus) -> anyhow::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO key_status (key_id, status) VALUES (?, ?)")
            .bind(key_id.as_u32() as i64)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        tracing::trace!(key_id = %key_id, status = %status, "Upserted key status");
        Ok(())
    }

    async fn read_all_key_statuses(&self) -> anyhow::Result<HashMap<KeyId, KeyStatus>> {
        let rows = sqlx::query("SELECT key_id, status FROM key_status")
            .fetch_all(&self.pool)
            .await?;

        let mut statuses = HashMap::with_capacity(rows.len());
        for row in &rows {
            let key_id: i64 = row.get("key_id");
            let status_str: String = row.get("status");
            statuses.insert(key_id_from_i64(key_id)?, key_status_from_string(&status_str)?);
        }

        Ok(statuses)
    }

    async fn count_key_status_rows(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM key_status")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}
