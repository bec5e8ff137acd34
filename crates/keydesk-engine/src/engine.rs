//! CustodyEngine - the desk's scan orchestrator
//!
//! The engine owns the active session, the in-memory custody cache, the
//! entry log facade and the registry mirror handle. Every scan flows
//! through `handle_scan`, which classifies the token and dispatches to
//! the badge or key path.
//!
//! Writes happen in a fixed order: the durable entry row first, the
//! cache flip second, the mirror enqueue last. A storage failure
//! therefore aborts the scan before any in-memory state changes, and the
//! registry only ever trails the cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use keydesk_core::domain::{
    CustodyError, DomainError, EntryRecord, KeyId, KeyRange, KeyStatus, ScanInput, StudentId,
    StudentSession,
};
use keydesk_core::ports::IEntryStore;

use crate::audit::AuditLog;
use crate::cache::CustodyCache;
use crate::mirror::MirrorHandle;

/// Default number of rows shown by log listings
pub const DEFAULT_LOG_LIMIT: u32 = 50;

/// One key's line in a status listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStatusRow {
    pub key_id: KeyId,
    pub status: KeyStatus,
    /// The student holding the key, when it is borrowed
    pub occupant: Option<StudentId>,
}

/// Scan orchestrator for a single desk
pub struct CustodyEngine {
    session: Option<StudentSession>,
    cache: CustodyCache,
    audit: AuditLog,
    mirror: MirrorHandle,
    range: KeyRange,
}

impl CustodyEngine {
    /// Builds the engine over a store and a running mirror writer.
    ///
    /// Seeds the key registry on first run and rebuilds the custody
    /// cache from the registry snapshot, so keys still out from a
    /// previous run stay borrowed across restarts.
    pub async fn new(
        store: Arc<dyn IEntryStore>,
        mirror: MirrorHandle,
        range: KeyRange,
    ) -> Result<Self, CustodyError> {
        store.seed_key_range(&range).await?;
        let statuses = store.read_all_key_statuses().await?;
        let cache = CustodyCache::from_statuses(&range, &statuses);

        let (available, borrowed) = cache.counts();
        tracing::info!(range = %range, available, borrowed, "Custody engine initialized");

        Ok(Self {
            session: None,
            cache,
            audit: AuditLog::new(store),
            mirror,
            range,
        })
    }

    /// Handles one raw scanner token and returns the desk message.
    pub async fn handle_scan(&mut self, raw: &str) -> Result<String, CustodyError> {
        match ScanInput::parse(raw, &self.range) {
            Ok(ScanInput::Badge(student_id)) => self.handle_badge_scan(student_id).await,
            Ok(ScanInput::Key(key)) => self.handle_key_scan(key).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Records a badge scan and makes the student the active session.
    ///
    /// The entry row is written before the session changes, so a storage
    /// failure leaves the previous session in place.
    pub async fn handle_badge_scan(
        &mut self,
        student_id: StudentId,
    ) -> Result<String, CustodyError> {
        let entry = self.audit.record_entry(&student_id).await?;
        self.session = Some(StudentSession::new(student_id.clone()));

        tracing::info!(student = %student_id, entry_id = ?entry.id(), "Student entered");
        Ok(format!("Student {student_id} entered the library."))
    }

    /// Handles a key scan for the active session.
    ///
    /// A borrowed key is returned; an available key is borrowed. Both
    /// require a session, matching the physical desk where a key scan
    /// only happens after a badge scan.
    pub async fn handle_key_scan(&mut self, key: KeyId) -> Result<String, CustodyError> {
        if !self.range.contains(key) {
            return Err(DomainError::KeyOutOfRange {
                key: key.as_u32(),
                first: self.range.first().as_u32(),
                last: self.range.last().as_u32(),
            }
            .into());
        }

        let Some(session) = self.session.as_ref() else {
            return Err(CustodyError::NoSession);
        };
        let student_id = session.student_id().clone();

        if self.cache.is_borrowed(key) {
            self.return_key(key).await
        } else {
            self.borrow_key(key, student_id).await
        }
    }

    /// Flips the open borrow row for `key` back to returned.
    async fn return_key(&mut self, key: KeyId) -> Result<String, CustodyError> {
        let Some(row) = self.audit.open_borrow_for_key(key).await? else {
            return Err(CustodyError::Persistence(anyhow::anyhow!(
                "Key {key} is marked borrowed but has no open borrow row"
            )));
        };
        let Some(row_id) = row.id() else {
            return Err(CustodyError::Persistence(anyhow::anyhow!(
                "Open borrow row for key {key} has no row id"
            )));
        };

        self.audit.record_return(row_id, key).await?;
        self.cache.mark_available(key)?;
        self.mirror.enqueue(key, KeyStatus::Available).await;

        tracing::info!(key = %key, student = %row.student_id(), "Key returned");
        Ok(format!("Key {key} returned."))
    }

    /// Claims the student's newest claimable entry row for a borrow.
    async fn borrow_key(
        &mut self,
        key: KeyId,
        student_id: StudentId,
    ) -> Result<String, CustodyError> {
        // One key per student. Holding the scanned key itself is not a
        // conflict; that only occurs when the registry has drifted, and
        // the borrow then re-records what the log already says.
        if let Some(open) = self.audit.open_borrow_for_student(&student_id).await? {
            if let Some(held) = open.key_id() {
                if held != key {
                    return Err(CustodyError::AlreadyHolding {
                        student: student_id,
                        key: held,
                    });
                }
            }
        }

        let Some(entry) = self.audit.claimable_entry_for(&student_id).await? else {
            return Err(CustodyError::Persistence(anyhow::anyhow!(
                "Student {student_id} has no entry row to record a borrow against"
            )));
        };
        let Some(entry_id) = entry.id() else {
            return Err(CustodyError::Persistence(anyhow::anyhow!(
                "Entry row for student {student_id} has no row id"
            )));
        };

        self.audit.record_borrow(entry_id, key).await?;
        self.cache.mark_borrowed(key)?;
        self.mirror.enqueue(key, KeyStatus::Borrowed).await;

        tracing::info!(key = %key, student = %student_id, "Key borrowed");
        Ok(format!("Key {key} borrowed by student {student_id}."))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// One row per key in the range, with the holder for borrowed keys.
    ///
    /// Occupants come from open borrow rows, newest first, so a key that
    /// somehow has several open borrows shows its latest holder.
    pub async fn list_status(&self) -> Result<Vec<KeyStatusRow>, CustodyError> {
        let mut occupants: HashMap<KeyId, StudentId> = HashMap::new();
        for row in self.audit.open_borrows().await? {
            if let Some(key) = row.key_id() {
                occupants
                    .entry(key)
                    .or_insert_with(|| row.student_id().clone());
            }
        }

        let rows = self
            .range
            .iter()
            .map(|key_id| {
                let status = self.cache.status(key_id).unwrap_or(KeyStatus::Available);
                let occupant = match status {
                    KeyStatus::Borrowed => occupants.get(&key_id).cloned(),
                    KeyStatus::Available => None,
                };
                KeyStatusRow {
                    key_id,
                    status,
                    occupant,
                }
            })
            .collect();
        Ok(rows)
    }

    /// The newest `limit` entry log rows.
    pub async fn list_recent_log(&self, limit: u32) -> Result<Vec<EntryRecord>, CustodyError> {
        Ok(self.audit.recent(limit).await?)
    }

    /// The active session, if a badge has been scanned.
    pub fn session(&self) -> Option<&StudentSession> {
        self.session.as_ref()
    }

    /// (available, borrowed) counts from the cache.
    pub fn counts(&self) -> (usize, usize) {
        self.cache.counts()
    }

    /// The key range this desk manages.
    pub fn range(&self) -> KeyRange {
        self.range
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Re-enqueues the full cache snapshot for the mirror writer.
    ///
    /// Repairs registry drift left by dropped mirror updates. Returns
    /// the number of keys queued.
    pub async fn resync(&self) -> usize {
        let statuses = self.cache.statuses();
        let count = statuses.len();
        for (key_id, status) in statuses {
            self.mirror.enqueue(key_id, status).await;
        }
        tracing::info!(keys = count, "Requeued full registry snapshot");
        count
    }

    /// Closes the mirror queue and waits for buffered writes to land.
    pub async fn shutdown(self) {
        self.mirror.shutdown().await;
    }
}
