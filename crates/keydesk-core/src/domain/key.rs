//! Key status and range types
//!
//! This module defines the registry-side view of a physical key: its
//! current custody status and the fixed range of key numbers the desk
//! manages.

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::KeyId;

/// Current custody status of a key
///
/// Every key in the configured range is in exactly one of these states
/// at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    /// The key hangs on the board and may be borrowed
    Available,
    /// The key is out with a student
    Borrowed,
}

impl KeyStatus {
    /// Stable string form used for persistence and display
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Available => "available",
            KeyStatus::Borrowed => "borrowed",
        }
    }
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for KeyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(KeyStatus::Available),
            "borrowed" => Ok(KeyStatus::Borrowed),
            other => Err(DomainError::InvalidInput(format!(
                "unknown key status: {other}"
            ))),
        }
    }
}

/// Default first key number
pub const DEFAULT_FIRST_KEY: u32 = 1;

/// Default last key number
pub const DEFAULT_LAST_KEY: u32 = 300;

/// The closed range of key numbers managed by the desk
///
/// Both endpoints are inclusive: a desk configured with `1..=300`
/// manages exactly 300 keys. The range is fixed at startup; keys are
/// not added or removed while the system runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    first: u32,
    last: u32,
}

impl KeyRange {
    /// Create a new KeyRange
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRange` if `first > last`.
    pub fn new(first: u32, last: u32) -> Result<Self, DomainError> {
        if first > last {
            return Err(DomainError::InvalidRange { first, last });
        }
        Ok(Self { first, last })
    }

    /// First key number (inclusive)
    #[must_use]
    pub const fn first(&self) -> KeyId {
        KeyId::new(self.first)
    }

    /// Last key number (inclusive)
    #[must_use]
    pub const fn last(&self) -> KeyId {
        KeyId::new(self.last)
    }

    /// Number of keys in the range
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    /// A closed range is never empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether the given key belongs to this range
    #[must_use]
    pub fn contains(&self, key: KeyId) -> bool {
        (self.first..=self.last).contains(&key.as_u32())
    }

    /// Iterate over every key in the range, in ascending order
    pub fn iter(&self) -> impl Iterator<Item = KeyId> {
        (self.first..=self.last).map(KeyId::new)
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST_KEY,
            last: DEFAULT_LAST_KEY,
        }
    }
}

impl std::fmt::Display for KeyRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}
