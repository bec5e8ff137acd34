//! In-memory key availability cache
//!
//! The [`CustodyCache`] partitions the configured key range into two
//! disjoint sets, `available` and `borrowed`. Every key in the range is
//! in exactly one of them at all times; keys outside the range are never
//! tracked. The cache answers availability checks on the scan path
//! without touching storage.

use std::collections::{HashMap, HashSet};

use keydesk_core::domain::{CustodyError, KeyId, KeyRange, KeyStatus};

/// The available/borrowed partition of the key range
///
/// Transitions are atomic: a failed `mark_*` call leaves both sets
/// untouched.
#[derive(Debug, Clone)]
pub struct CustodyCache {
    available: HashSet<KeyId>,
    borrowed: HashSet<KeyId>,
}

impl CustodyCache {
    /// Creates a cache with every key in the range available
    pub fn new(range: &KeyRange) -> Self {
        Self {
            available: range.iter().collect(),
            borrowed: HashSet::new(),
        }
    }

    /// Builds a cache from a registry snapshot
    ///
    /// Keys present in the snapshot take their recorded status; keys in
    /// the range but missing from the snapshot default to available, so
    /// a range that grew since the registry was seeded is still fully
    /// covered. Snapshot entries outside the range are ignored.
    pub fn from_statuses(range: &KeyRange, statuses: &HashMap<KeyId, KeyStatus>) -> Self {
        let mut cache = Self {
            available: HashSet::with_capacity(range.len() as usize),
            borrowed: HashSet::new(),
        };

        for key in range.iter() {
            match statuses.get(&key) {
                Some(KeyStatus::Borrowed) => cache.borrowed.insert(key),
                _ => cache.available.insert(key),
            };
        }

        cache
    }

    /// Whether the key currently hangs on the board
    #[must_use]
    pub fn is_available(&self, key: KeyId) -> bool {
        self.available.contains(&key)
    }

    /// Whether the key is currently out with a student
    #[must_use]
    pub fn is_borrowed(&self, key: KeyId) -> bool {
        self.borrowed.contains(&key)
    }

    /// Current status of a tracked key, or `None` for untracked keys
    #[must_use]
    pub fn status(&self, key: KeyId) -> Option<KeyStatus> {
        if self.available.contains(&key) {
            Some(KeyStatus::Available)
        } else if self.borrowed.contains(&key) {
            Some(KeyStatus::Borrowed)
        } else {
            None
        }
    }

    /// Moves a key from available to borrowed
    ///
    /// # Errors
    /// Returns `CustodyError::InvalidTransition` without mutating anything
    /// if the key is not currently available.
    pub fn mark_borrowed(&mut self, key: KeyId) -> Result<(), CustodyError> {
        if !self.available.remove(&key) {
            return Err(CustodyError::InvalidTransition {
                key,
                from: self.status(key).unwrap_or(KeyStatus::Borrowed),
                to: KeyStatus::Borrowed,
            });
        }
        self.borrowed.insert(key);
        Ok(())
    }

    /// Moves a key from borrowed back to available
    ///
    /// # Errors
    /// Returns `CustodyError::InvalidTransition` without mutating anything
    /// if the key is not currently borrowed.
    pub fn mark_available(&mut self, key: KeyId) -> Result<(), CustodyError> {
        if !self.borrowed.remove(&key) {
            return Err(CustodyError::InvalidTransition {
                key,
                from: self.status(key).unwrap_or(KeyStatus::Available),
                to: KeyStatus::Available,
            });
        }
        self.available.insert(key);
        Ok(())
    }

    /// Returns `(available, borrowed)` counts
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        (self.available.len(), self.borrowed.len())
    }

    /// Total number of tracked keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.available.len() + self.borrowed.len()
    }

    /// Whether the cache tracks no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.available.is_empty() && self.borrowed.is_empty()
    }

    /// Snapshot of every tracked key and its status
    ///
    /// Used for full-registry resyncs and status listings.
    #[must_use]
    pub fn statuses(&self) -> HashMap<KeyId, KeyStatus> {
        let mut snapshot = HashMap::with_capacity(self.len());
        for key in &self.available {
            snapshot.insert(*key, KeyStatus::Available);
        }
        for key in &self.borrowed {
            snapshot.insert(*key, KeyStatus::Borrowed);
        }
        snapshot
    }
}
