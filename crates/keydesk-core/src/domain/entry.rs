//! Entry log domain entities
//!
//! This module defines the append-only entry log types: every badge scan
//! produces an `EntryRecord`, and later key scans write its key fields.
//! A borrow claims a claimable row; the matching return flips that same
//! row to `Returned`, which makes it claimable again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{EntryId, KeyId, StudentId};

/// The custody transition recorded on an entry row
///
/// Distinct from `KeyStatus`: a `KeyEvent` is what happened (this row
/// borrowed or returned a key), while `KeyStatus` is where the key is now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEvent {
    /// The key left the board with this entry's student
    Borrowed,
    /// The key came back to the board
    Returned,
}

impl KeyEvent {
    /// Stable string form used for persistence and display
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyEvent::Borrowed => "borrowed",
            KeyEvent::Returned => "returned",
        }
    }
}

impl std::fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for KeyEvent {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrowed" => Ok(KeyEvent::Borrowed),
            "returned" => Ok(KeyEvent::Returned),
            other => Err(DomainError::InvalidInput(format!(
                "unknown key event: {other}"
            ))),
        }
    }
}

/// One row of the entry log
///
/// An `EntryRecord` is created when a student scans their badge with its
/// key fields (`key_id`, `key_event`) unset. A borrow claims the student's
/// most recent claimable row by writing those fields, and the matching
/// return flips the same row to `Returned`. Rows are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Unique identifier for this entry (assigned by the database)
    id: Option<EntryId>,
    /// The student who scanned in
    student_id: StudentId,
    /// When the badge was scanned
    entry_time: DateTime<Utc>,
    /// The key this entry borrowed or returned, if any yet
    key_id: Option<KeyId>,
    /// What happened with that key
    key_event: Option<KeyEvent>,
}

impl EntryRecord {
    /// Creates a new entry for a badge scan happening now
    ///
    /// The `id` field is set to `None` and will be assigned by the database
    /// when the entry is persisted. The key fields start unset.
    pub fn new(student_id: StudentId) -> Self {
        Self {
            id: None,
            student_id,
            entry_time: Utc::now(),
            key_id: None,
            key_event: None,
        }
    }

    /// Returns the entry ID (None if not yet persisted)
    pub fn id(&self) -> Option<EntryId> {
        self.id
    }

    /// Returns the student who scanned in
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    /// Returns when the badge was scanned
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Returns the key this entry touched, if any
    pub fn key_id(&self) -> Option<KeyId> {
        self.key_id
    }

    /// Returns the recorded key event, if any
    pub fn key_event(&self) -> Option<KeyEvent> {
        self.key_event
    }

    /// Sets the ID for this entry (typically called after database insert)
    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the entry time (used when rehydrating rows from storage)
    pub fn with_entry_time(mut self, entry_time: DateTime<Utc>) -> Self {
        self.entry_time = entry_time;
        self
    }

    /// Sets the key fields (the update a key scan performs)
    pub fn with_key(mut self, key_id: KeyId, event: KeyEvent) -> Self {
        self.key_id = Some(key_id);
        self.key_event = Some(event);
        self
    }

    /// True if this row records a borrow that has not been returned
    ///
    /// Open borrows define who currently holds a key.
    #[must_use]
    pub fn is_open_borrow(&self) -> bool {
        self.key_event == Some(KeyEvent::Borrowed)
    }

    /// True if a borrow may still claim this row's key fields
    ///
    /// A row is claimable while its key fields are unset or record a
    /// completed return.
    #[must_use]
    pub fn is_claimable(&self) -> bool {
        matches!(self.key_event, None | Some(KeyEvent::Returned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(token: &str) -> StudentId {
        StudentId::new(token.to_string()).unwrap()
    }

    #[test]
    fn test_key_event_serialization() {
        let json = serde_json::to_string(&KeyEvent::Borrowed).unwrap();
        assert_eq!(json, "\"borrowed\"");

        let deserialized: KeyEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, KeyEvent::Borrowed);
    }

    #[test]
    fn test_key_event_parse() {
        assert_eq!("returned".parse::<KeyEvent>().unwrap(), KeyEvent::Returned);
        assert!("gone".parse::<KeyEvent>().is_err());
    }

    #[test]
    fn test_entry_new() {
        let entry = EntryRecord::new(student("AB123456"));

        assert!(entry.id().is_none()); // ID assigned on persist
        assert_eq!(entry.student_id().as_str(), "AB123456");
        assert!(entry.key_id().is_none());
        assert!(entry.key_event().is_none());
    }

    #[test]
    fn test_entry_with_id() {
        let entry = EntryRecord::new(student("AB123456")).with_id(EntryId::new(42));
        assert_eq!(entry.id(), Some(EntryId::new(42)));
    }

    #[test]
    fn test_entry_with_key() {
        let entry =
            EntryRecord::new(student("AB123456")).with_key(KeyId::new(5), KeyEvent::Borrowed);

        assert_eq!(entry.key_id(), Some(KeyId::new(5)));
        assert_eq!(entry.key_event(), Some(KeyEvent::Borrowed));
    }

    #[test]
    fn test_open_borrow_detection() {
        let fresh = EntryRecord::new(student("AB123456"));
        assert!(!fresh.is_open_borrow());
        assert!(fresh.is_claimable());

        let borrowed = fresh.clone().with_key(KeyId::new(5), KeyEvent::Borrowed);
        assert!(borrowed.is_open_borrow());
        assert!(!borrowed.is_claimable());

        let returned = fresh.with_key(KeyId::new(5), KeyEvent::Returned);
        assert!(!returned.is_open_borrow());
        assert!(returned.is_claimable());
    }

    #[test]
    fn test_entry_serialization() {
        let entry = EntryRecord::new(student("AB123456"))
            .with_id(EntryId::new(1))
            .with_key(KeyId::new(12), KeyEvent::Returned);

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: EntryRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, entry);
    }
}
