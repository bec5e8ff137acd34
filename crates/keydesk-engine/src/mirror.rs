//! Background key registry writer
//!
//! The custody cache is authoritative while the process runs; this module
//! keeps the durable `key_status` registry trailing it. Status flips are
//! queued onto a bounded channel and applied by a spawned task, so a slow
//! or briefly failing database never blocks the desk. Failed writes are
//! retried with a doubling delay and dropped after the final attempt;
//! `CustodyEngine::resync` re-enqueues the full snapshot to repair any
//! drift that causes.
//!
//! Closing the handle closes the queue; the task drains buffered updates
//! before it stops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use keydesk_core::config::MirrorConfig;
use keydesk_core::domain::{key::KeyStatus, newtypes::KeyId};
use keydesk_core::ports::IEntryStore;

/// A single registry write: key X is now in status Y
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorUpdate {
    pub key_id: KeyId,
    pub status: KeyStatus,
}

/// The background task that applies queued updates to the registry
pub struct MirrorWriter {
    update_rx: mpsc::Receiver<MirrorUpdate>,
    store: Arc<dyn IEntryStore>,
    max_retries: u32,
    retry_base: Duration,
}

impl MirrorWriter {
    /// Spawns the writer task and returns the handle used to feed it.
    pub fn spawn(store: Arc<dyn IEntryStore>, config: &MirrorConfig) -> MirrorHandle {
        let (update_tx, update_rx) = mpsc::channel(config.queue_capacity);
        let writer = MirrorWriter {
            update_rx,
            store,
            max_retries: config.max_retries,
            retry_base: Duration::from_millis(config.retry_base_ms),
        };
        let task = tokio::spawn(writer.run());
        MirrorHandle { update_tx, task }
    }

    async fn run(mut self) {
        tracing::info!("Mirror writer started");

        while let Some(update) = self.update_rx.recv().await {
            self.apply(update).await;
        }

        tracing::info!("Mirror writer stopped");
    }

    /// Apply one update, retrying with a doubling delay.
    async fn apply(&self, update: MirrorUpdate) {
        let mut delay = self.retry_base;

        for attempt in 0..=self.max_retries {
            match self
                .store
                .upsert_key_status(update.key_id, update.status)
                .await
            {
                Ok(()) => {
                    if attempt > 0 {
                        tracing::debug!(
                            key_id = %update.key_id,
                            attempt,
                            "Registry write succeeded after retry"
                        );
                    }
                    tracing::trace!(
                        key_id = %update.key_id,
                        status = %update.status,
                        "Mirrored key status"
                    );
                    return;
                }
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!(
                        key_id = %update.key_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Registry write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    tracing::error!(
                        key_id = %update.key_id,
                        attempts = self.max_retries + 1,
                        error = %e,
                        "Registry write failed on final attempt, dropping update"
                    );
                }
            }
        }
    }
}

/// Sending side of the mirror queue, owned by the custody engine
pub struct MirrorHandle {
    update_tx: mpsc::Sender<MirrorUpdate>,
    task: JoinHandle<()>,
}

impl MirrorHandle {
    /// Queue a registry write for the given key.
    ///
    /// Applies backpressure when the queue is full. A closed queue only
    /// happens if the writer task died; the update is dropped with a
    /// warning and `resync` can repair the registry later.
    pub async fn enqueue(&self, key_id: KeyId, status: KeyStatus) {
        let update = MirrorUpdate { key_id, status };
        if let Err(e) = self.update_tx.send(update).await {
            tracing::warn!(
                key_id = %e.0.key_id,
                "Mirror queue closed, dropping registry update"
            );
        }
    }

    /// Close the queue and wait for the writer to drain it.
    pub async fn shutdown(self) {
        drop(self.update_tx);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Mirror writer task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};
    use keydesk_core::config::ConfigBuilder;
    use keydesk_core::domain::{
        entry::{EntryRecord, KeyEvent},
        key::KeyRange,
        newtypes::{EntryId, StudentId},
    };
    use keydesk_core::ports::EntryFilter;

    /// Store that records registry writes, failing the first `failures` of them
    struct FlakyStore {
        failures_left: Mutex<u32>,
        attempts: Mutex<u32>,
        written: Mutex<Vec<(KeyId, KeyStatus)>>,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: Mutex::new(failures),
                attempts: Mutex::new(0),
                written: Mutex::new(Vec::new()),
            }
        }

        fn written(&self) -> Vec<(KeyId, KeyStatus)> {
            self.written.lock().unwrap().clone()
        }

        fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl IEntryStore for FlakyStore {
        async fn append_entry(
            &self,
            _: &StudentId,
            _: DateTime<Utc>,
        ) -> anyhow::Result<EntryId> {
            Ok(EntryId::new(1))
        }
        async fn update_entry_key(&self, _: EntryId, _: KeyId, _: KeyEvent) -> anyhow::Result<()> {
            Ok(())
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
        async fn upsert_key_status(&self, key_id: KeyId, status: KeyStatus) -> anyhow::Result<()> {
            *self.attempts.lock().unwrap() += 1;
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                anyhow::bail!("Database locked");
            }
            self.written.lock().unwrap().push((key_id, status));
            Ok(())
        }
        async fn read_all_key_statuses(&self) -> anyhow::Result<HashMap<KeyId, KeyStatus>> {
            Ok(HashMap::new())
        }
        async fn count_key_status_rows(&self) -> anyhow::Result<u64> {
            Ok(0)
        }
    }

    fn fast_config(max_retries: u32) -> keydesk_core::config::MirrorConfig {
        ConfigBuilder::new()
            .mirror_max_retries(max_retries)
            .mirror_retry_base_ms(1)
            .build()
            .mirror
    }

    #[tokio::test]
    async fn test_updates_applied_in_order() {
        let store = Arc::new(FlakyStore::new(0));
        let handle = MirrorWriter::spawn(store.clone(), &fast_config(0));

        handle.enqueue(KeyId::new(5), KeyStatus::Borrowed).await;
        handle.enqueue(KeyId::new(5), KeyStatus::Available).await;
        handle.enqueue(KeyId::new(7), KeyStatus::Borrowed).await;
        handle.shutdown().await;

        assert_eq!(
            store.written(),
            vec![
                (KeyId::new(5), KeyStatus::Borrowed),
                (KeyId::new(5), KeyStatus::Available),
                (KeyId::new(7), KeyStatus::Borrowed),
            ]
        );
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let store = Arc::new(FlakyStore::new(2));
        let handle = MirrorWriter::spawn(store.clone(), &fast_config(5));

        handle.enqueue(KeyId::new(3), KeyStatus::Borrowed).await;
        handle.shutdown().await;

        assert_eq!(store.written(), vec![(KeyId::new(3), KeyStatus::Borrowed)]);
        assert_eq!(store.attempts(), 3); // 2 failures + 1 success
    }

    #[tokio::test]
    async fn test_update_dropped_after_final_attempt() {
        // More failures than attempts: the update is dropped, later
        // updates still go through.
        let store = Arc::new(FlakyStore::new(10));
        let handle = MirrorWriter::spawn(store.clone(), &fast_config(1));

        handle.enqueue(KeyId::new(9), KeyStatus::Borrowed).await;
        handle.enqueue(KeyId::new(9), KeyStatus::Available).await;
        handle.shutdown().await;

        // First update burns attempts 1-2, second burns attempts 3-4 of
        // the 10 injected failures. Nothing lands, nothing panics.
        assert_eq!(store.attempts(), 4);
        assert!(store.written().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_drains_buffered_updates() {
        let store = Arc::new(FlakyStore::new(0));
        let handle = MirrorWriter::spawn(store.clone(), &fast_config(0));

        for key in 1..=20u32 {
            handle.enqueue(KeyId::new(key), KeyStatus::Borrowed).await;
        }
        handle.shutdown().await;

        assert_eq!(store.written().len(), 20);
    }
}
