//! Entry store port (driven/secondary port)
//!
//! This module defines the interface for persisting and querying the
//! entry log and the key status registry.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, filesystem, etc.) and don't need domain-level classification.
//! - The `EntryFilter` struct provides a composable query mechanism
//!   without exposing storage implementation details.
//! - `query_entries` always returns rows newest-first: maximum
//!   `entry_time` first, row ID as the tiebreaker for equal timestamps.
//!   The engine's "most recent entry" selections rely on that ordering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    entry::{EntryRecord, KeyEvent},
    key::{KeyRange, KeyStatus},
    newtypes::{EntryId, KeyId, StudentId},
};

// ============================================================================
// EntryFilter struct
// ============================================================================

/// Predicate on the key fields of an entry row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFieldFilter {
    /// Rows whose key fields record the given event
    Event(KeyEvent),
    /// Rows whose key fields are still claimable: unset, or a completed
    /// return
    Unclaimed,
}

/// Filter criteria for querying entry rows
///
/// All fields are optional; when `None`, no filtering is applied for that
/// field. Multiple filters are combined with AND logic.
///
/// # Example
///
/// ```
/// use keydesk_core::domain::{KeyEvent, KeyId};
/// use keydesk_core::ports::{EntryFilter, KeyFieldFilter};
///
/// // The open borrow for key 5, if any
/// let filter = EntryFilter::new()
///     .with_key_id(KeyId::new(5))
///     .with_key_field(KeyFieldFilter::Event(KeyEvent::Borrowed));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Filter by the student who scanned in
    pub student_id: Option<StudentId>,
    /// Filter by the key recorded on the row
    pub key_id: Option<KeyId>,
    /// Filter by the state of the row's key fields
    pub key_field: Option<KeyFieldFilter>,
}

impl EntryFilter {
    /// Creates a new empty filter (matches all entries)
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the student ID filter
    pub fn with_student_id(mut self, student_id: StudentId) -> Self {
        self.student_id = Some(student_id);
        self
    }

    /// Sets the key ID filter
    pub fn with_key_id(mut self, key_id: KeyId) -> Self {
        self.key_id = Some(key_id);
        self
    }

    /// Sets the key-field filter
    pub fn with_key_field(mut self, key_field: KeyFieldFilter) -> Self {
        self.key_field = Some(key_field);
        self
    }

    /// Returns true if no filters are set
    pub fn is_empty(&self) -> bool {
        self.student_id.is_none() && self.key_id.is_none() && self.key_field.is_none()
    }
}

// ============================================================================
// IEntryStore trait
// ============================================================================

/// Port trait for persistent custody storage
///
/// This is the single persistence interface of KeyDesk. It covers the
/// append-only entry log (the system of record) and the key status
/// registry (the durable mirror of the in-memory cache).
///
/// ## Implementation Notes
///
/// - Individual operations must be atomic; a failed call leaves storage
///   unchanged.
/// - `update_entry_key` is the only permitted mutation of an existing
///   entry row; the engine uses it to claim a row for a borrow and to
///   flip that row on the matching return.
/// - `seed_key_range` must be idempotent: a non-empty registry is left
///   exactly as it is.
#[async_trait::async_trait]
pub trait IEntryStore: Send + Sync {
    // --- Entry log operations ---

    /// Appends a badge-scan row with unset key fields
    ///
    /// Returns the row ID assigned by the store.
    async fn append_entry(
        &self,
        student_id: &StudentId,
        entry_time: DateTime<Utc>,
    ) -> anyhow::Result<EntryId>;

    /// Fills in the key fields of an existing entry row
    async fn update_entry_key(
        &self,
        id: EntryId,
        key_id: KeyId,
        event: KeyEvent,
    ) -> anyhow::Result<()>;

    /// Queries entry rows matching the given filter criteria
    ///
    /// Returns at most `limit` rows ordered newest-first (entry time
    /// descending, row ID descending).
    async fn query_entries(
        &self,
        filter: &EntryFilter,
        limit: u32,
    ) -> anyhow::Result<Vec<EntryRecord>>;

    // --- Key registry operations ---

    /// Seeds one `Available` registry row per key in the range
    ///
    /// Does nothing if the registry already contains rows.
    async fn seed_key_range(&self, range: &KeyRange) -> anyhow::Result<()>;

    /// Inserts or overwrites the registry status of a single key
    async fn upsert_key_status(&self, key_id: KeyId, status: KeyStatus) -> anyhow::Result<()>;

    /// Reads the full registry snapshot
    async fn read_all_key_statuses(&self) -> anyhow::Result<HashMap<KeyId, KeyStatus>>;

    /// Counts registry rows (used to decide whether seeding is needed)
    async fn count_key_status_rows(&self) -> anyhow::Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_builder() {
        let student = StudentId::new("AB123456".to_string()).unwrap();
        let filter = EntryFilter::new()
            .with_student_id(student.clone())
            .with_key_field(KeyFieldFilter::Unclaimed);

        assert_eq!(filter.student_id, Some(student));
        assert_eq!(filter.key_id, None);
        assert_eq!(filter.key_field, Some(KeyFieldFilter::Unclaimed));
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_empty_filter() {
        let filter = EntryFilter::new();
        assert!(filter.is_empty());
    }
}
