//! AuditLog - high-level entry log service
//!
//! Wraps `IEntryStore` with one method per custody event and one per
//! lookup the engine needs. Unlike a diagnostics trail, the entry log is
//! the system of record: a scan that cannot be written must not appear
//! to succeed, so every method here propagates storage errors instead of
//! swallowing them.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use keydesk_core::{
    domain::{
        entry::{EntryRecord, KeyEvent},
        newtypes::{EntryId, KeyId, StudentId},
    },
    ports::{EntryFilter, IEntryStore, KeyFieldFilter},
};

/// Row limit standing in for "all": the open-borrow count is bounded by
/// the key range, never by the log length.
const ALL_ROWS: u32 = u32::MAX;

/// Entry log service backed by the persistent store
pub struct AuditLog {
    store: Arc<dyn IEntryStore>,
}

impl AuditLog {
    /// Creates a new `AuditLog` backed by the given entry store.
    pub fn new(store: Arc<dyn IEntryStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Custody events
    // ========================================================================

    /// Record a badge scan and return the persisted row.
    pub async fn record_entry(&self, student_id: &StudentId) -> anyhow::Result<EntryRecord> {
        let entry_time = Utc::now();
        let id = self
            .store
            .append_entry(student_id, entry_time)
            .await
            .context("Failed to record badge entry")?;

        Ok(EntryRecord::new(student_id.clone())
            .with_id(id)
            .with_entry_time(entry_time))
    }

    /// Record a borrow by claiming the given entry row's key fields.
    pub async fn record_borrow(&self, entry_id: EntryId, key: KeyId) -> anyhow::Result<()> {
        self.store
            .update_entry_key(entry_id, key, KeyEvent::Borrowed)
            .await
            .with_context(|| format!("Failed to record borrow of key {key}"))
    }

    /// Record a return by flipping the borrow row's key fields.
    pub async fn record_return(&self, entry_id: EntryId, key: KeyId) -> anyhow::Result<()> {
        self.store
            .update_entry_key(entry_id, key, KeyEvent::Returned)
            .await
            .with_context(|| format!("Failed to record return of key {key}"))
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// The newest open borrow row for a key, if any.
    ///
    /// This is the row a return flips. For a consistent log there is at
    /// most one open borrow per key; newest-first ordering makes the
    /// lookup self-healing if history ever disagrees.
    pub async fn open_borrow_for_key(&self, key: KeyId) -> anyhow::Result<Option<EntryRecord>> {
        let filter = EntryFilter::new()
            .with_key_id(key)
            .with_key_field(KeyFieldFilter::Event(KeyEvent::Borrowed));
        let rows = self
            .store
            .query_entries(&filter, 1)
            .await
            .with_context(|| format!("Failed to look up open borrow for key {key}"))?;
        Ok(rows.into_iter().next())
    }

    /// The newest open borrow row for a student, if any.
    pub async fn open_borrow_for_student(
        &self,
        student_id: &StudentId,
    ) -> anyhow::Result<Option<EntryRecord>> {
        let filter = EntryFilter::new()
            .with_student_id(student_id.clone())
            .with_key_field(KeyFieldFilter::Event(KeyEvent::Borrowed));
        let rows = self
            .store
            .query_entries(&filter, 1)
            .await
            .with_context(|| format!("Failed to look up open borrow for student {student_id}"))?;
        Ok(rows.into_iter().next())
    }

    /// The student's newest claimable entry row, if any.
    ///
    /// A borrow writes its key fields into this row. Rows with unset key
    /// fields and rows holding a completed return both qualify.
    pub async fn claimable_entry_for(
        &self,
        student_id: &StudentId,
    ) -> anyhow::Result<Option<EntryRecord>> {
        let filter = EntryFilter::new()
            .with_student_id(student_id.clone())
            .with_key_field(KeyFieldFilter::Unclaimed);
        let rows = self
            .store
            .query_entries(&filter, 1)
            .await
            .with_context(|| format!("Failed to look up entry row for student {student_id}"))?;
        Ok(rows.into_iter().next())
    }

    /// All open borrow rows, newest first.
    pub async fn open_borrows(&self) -> anyhow::Result<Vec<EntryRecord>> {
        let filter = EntryFilter::new().with_key_field(KeyFieldFilter::Event(KeyEvent::Borrowed));
        self.store
            .query_entries(&filter, ALL_ROWS)
            .await
            .context("Failed to list open borrows")
    }

    /// The newest `limit` entry rows, unfiltered.
    pub async fn recent(&self, limit: u32) -> anyhow::Result<Vec<EntryRecord>> {
        self.store
            .query_entries(&EntryFilter::new(), limit)
            .await
            .context("Failed to list recent entries")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};
    use keydesk_core::domain::key::{KeyRange, KeyStatus};

    /// In-memory mock store that records writes and serves canned rows
    struct RecordingStore {
        appended: Mutex<Vec<(StudentId, DateTime<Utc>)>>,
        updated: Mutex<Vec<(EntryId, KeyId, KeyEvent)>>,
        queries: Mutex<Vec<(EntryFilter, u32)>>,
        canned: Mutex<Vec<EntryRecord>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                appended: Mutex::new(Vec::new()),
                updated: Mutex::new(Vec::new()),
                queries: Mutex::new(Vec::new()),
                canned: Mutex::new(Vec::new()),
            }
        }

        fn with_rows(rows: Vec<EntryRecord>) -> Self {
            let store = Self::new();
            *store.canned.lock().unwrap() = rows;
            store
        }
    }

    #[async_trait::async_trait]
    impl IEntryStore for RecordingStore {
        async fn append_entry(
            &self,
            student_id: &StudentId,
            entry_time: DateTime<Utc>,
        ) -> anyhow::Result<EntryId> {
            let mut appended = self.appended.lock().unwrap();
            appended.push((student_id.clone(), entry_time));
            Ok(EntryId::new(appended.len() as i64))
        }

        async fn update_entry_key(
            &self,
            id: EntryId,
            key_id: KeyId,
            event: KeyEvent,
        ) -> anyhow::Result<()> {
            self.updated.lock().unwrap().push((id, key_id, event));
            Ok(())
        }

        async fn query_entries(
            &self,
            filter: &EntryFilter,
            limit: u32,
        ) -> anyhow::Result<Vec<EntryRecord>> {
            self.queries.lock().unwrap().push((filter.clone(), limit));
            let rows = self.canned.lock().unwrap().clone();
            Ok(rows.into_iter().take(limit as usize).collect())
        }

        async fn seed_key_range(&self, _range: &KeyRange) -> anyhow::Result<()> {
            Ok(())
        }

        async fn upsert_key_status(&self, _key_id: KeyId, _status: KeyStatus) -> anyhow::Result<()> {
            Ok(())
        }

        async fn read_all_key_statuses(&self) -> anyhow::Result<HashMap<KeyId, KeyStatus>> {
            Ok(HashMap::new())
        }

        async fn count_key_status_rows(&self) -> anyhow::Result<u64> {
            Ok(0)
        }
    }

    fn student(token: &str) -> StudentId {
        StudentId::new(token.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_record_entry_returns_persisted_row() {
        let store = Arc::new(RecordingStore::new());
        let log = AuditLog::new(store.clone());

        let entry = log.record_entry(&student("AB123456")).await.unwrap();

        assert_eq!(entry.id(), Some(EntryId::new(1)));
        assert_eq!(entry.student_id().as_str(), "AB123456");
        assert!(entry.key_id().is_none());

        let appended = store.appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].1, entry.entry_time());
    }

    #[tokio::test]
    async fn test_record_borrow_and_return_update_the_row() {
        let store = Arc::new(RecordingStore::new());
        let log = AuditLog::new(store.clone());

        log.record_borrow(EntryId::new(3), KeyId::new(5))
            .await
            .unwrap();
        log.record_return(EntryId::new(3), KeyId::new(5))
            .await
            .unwrap();

        let updated = store.updated.lock().unwrap();
        assert_eq!(
            *updated,
            vec![
                (EntryId::new(3), KeyId::new(5), KeyEvent::Borrowed),
                (EntryId::new(3), KeyId::new(5), KeyEvent::Returned),
            ]
        );
    }

    #[tokio::test]
    async fn test_open_borrow_for_key_takes_newest_row() {
        let newest = EntryRecord::new(student("AB123456"))
            .with_id(EntryId::new(9))
            .with_key(KeyId::new(5), KeyEvent::Borrowed);
        let store = Arc::new(RecordingStore::with_rows(vec![newest.clone()]));
        let log = AuditLog::new(store.clone());

        let found = log.open_borrow_for_key(KeyId::new(5)).await.unwrap();
        assert_eq!(found, Some(newest));

        let queries = store.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].0.key_id, Some(KeyId::new(5)));
        assert_eq!(
            queries[0].0.key_field,
            Some(KeyFieldFilter::Event(KeyEvent::Borrowed))
        );
        assert_eq!(queries[0].1, 1);
    }

    #[tokio::test]
    async fn test_claimable_lookup_filters_unclaimed() {
        let store = Arc::new(RecordingStore::new());
        let log = AuditLog::new(store.clone());

        let found = log.claimable_entry_for(&student("AB123456")).await.unwrap();
        assert!(found.is_none());

        let queries = store.queries.lock().unwrap();
        assert_eq!(queries[0].0.student_id, Some(student("AB123456")));
        assert_eq!(queries[0].0.key_field, Some(KeyFieldFilter::Unclaimed));
    }

    #[tokio::test]
    async fn test_recent_passes_limit_through() {
        let store = Arc::new(RecordingStore::new());
        let log = AuditLog::new(store.clone());

        log.recent(25).await.unwrap();

        let queries = store.queries.lock().unwrap();
        assert!(queries[0].0.is_empty());
        assert_eq!(queries[0].1, 25);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        /// A store that always fails on writes
        struct FailingStore;

        #[async_trait::async_trait]
        impl IEntryStore for FailingStore {
            async fn append_entry(
                &self,
                _: &StudentId,
                _: DateTime<Utc>,
            ) -> anyhow::Result<EntryId> {
                anyhow::bail!("Database write error")
            }
            async fn update_entry_key(
                &self,
                _: EntryId,
                _: KeyId,
                _: KeyEvent,
            ) -> anyhow::Result<()> {
                anyhow::bail!("Database write error")
            }
            async fn query_entries(
                &self,
                _: &EntryFilter,
                _: u32,
            ) -> anyhow::Result<Vec<EntryRecord>> {
                Ok(vec![])
            }
            async fn seed_key_range(&self, _: &KeyRange) -> anyhow::Result<()> {
                Ok(())
            }
            async fn upsert_key_status(&self, _: KeyId, _: KeyStatus) -> anyhow::Result<()> {
                Ok(())
            }
            async fn read_all_key_statuses(&self) -> anyhow::Result<HashMap<KeyId, KeyStatus>> {
                Ok(HashMap::new())
            }
            async fn count_key_status_rows(&self) -> anyhow::Result<u64> {
                Ok(0)
            }
        }

        let log = AuditLog::new(Arc::new(FailingStore));

        // The entry log is the system of record, so failures surface.
        let entry = log.record_entry(&student("AB123456")).await;
        assert!(entry.is_err());

        let borrow = log.record_borrow(EntryId::new(1), KeyId::new(5)).await;
        assert!(borrow.is_err());
    }
}
