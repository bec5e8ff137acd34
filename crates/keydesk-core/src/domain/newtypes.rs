//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Student badge token
// ============================================================================

/// A validated student badge token
///
/// Badge readers emit an 8-character ASCII-alphanumeric token, e.g.
/// `"AB123456"`. The constructor rejects anything else, so a held
/// `StudentId` is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    /// Exact length of a badge token
    pub const BADGE_LEN: usize = 8;

    /// Create a new StudentId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStudentId` if the token is not exactly
    /// 8 ASCII-alphanumeric characters.
    pub fn new(token: String) -> Result<Self, DomainError> {
        if !Self::is_valid(&token) {
            return Err(DomainError::InvalidStudentId(format!(
                "expected {} ASCII-alphanumeric characters, got {token:?}",
                Self::BADGE_LEN
            )));
        }
        Ok(Self(token))
    }

    /// Check whether a raw token has the badge shape
    #[must_use]
    pub fn is_valid(token: &str) -> bool {
        token.len() == Self::BADGE_LEN && token.chars().all(|c| c.is_ascii_alphanumeric())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StudentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StudentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for StudentId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<StudentId> for String {
    fn from(id: StudentId) -> Self {
        id.0
    }
}

// ============================================================================
// Key identifier
// ============================================================================

/// Identifier for a physical key (the number engraved on the fob)
///
/// A `KeyId` is just a typed number; whether it belongs to the desk's
/// configured range is checked against a `KeyRange` at the parsing
/// boundary, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(u32);

impl KeyId {
    /// Create a KeyId from a u32 value
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner u32 value
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KeyId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(Self)
            .map_err(|e| DomainError::InvalidKeyId(format!("{s:?}: {e}")))
    }
}

impl From<u32> for KeyId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// Entry log row identifier
// ============================================================================

/// Identifier for entry log rows (database row ID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(i64);

impl EntryId {
    /// Create an EntryId from an i64 value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid EntryId: {e}")))
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod student_id_tests {
        use super::*;

        #[test]
        fn test_valid_badge() {
            let id = StudentId::new("AB123456".to_string()).unwrap();
            assert_eq!(id.as_str(), "AB123456");
        }

        #[test]
        fn test_all_digits_is_valid() {
            // Numeric badges exist; classification against key numbers
            // happens at the scan-parsing boundary.
            let id = StudentId::new("12345678".to_string()).unwrap();
            assert_eq!(id.as_str(), "12345678");
        }

        #[test]
        fn test_too_short_fails() {
            let result = StudentId::new("AB12345".to_string());
            assert!(result.is_err());
        }

        #[test]
        fn test_too_long_fails() {
            let result = StudentId::new("AB1234567".to_string());
            assert!(result.is_err());
        }

        #[test]
        fn test_non_alphanumeric_fails() {
            let result = StudentId::new("AB12-456".to_string());
            assert!(result.is_err());
        }

        #[test]
        fn test_non_ascii_fails() {
            let result = StudentId::new("ÅB123456".to_string());
            assert!(result.is_err());
        }

        #[test]
        fn test_empty_fails() {
            let result = StudentId::new(String::new());
            assert!(result.is_err());
        }

        #[test]
        fn test_from_str() {
            let id: StudentId = "zz999999".parse().unwrap();
            assert_eq!(id.as_str(), "zz999999");
        }

        #[test]
        fn test_serde_roundtrip() {
            let id = StudentId::new("AB123456".to_string()).unwrap();
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, "\"AB123456\"");
            let parsed: StudentId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, parsed);
        }

        #[test]
        fn test_serde_rejects_invalid() {
            let result: Result<StudentId, _> = serde_json::from_str("\"bad\"");
            assert!(result.is_err());
        }
    }

    mod key_id_tests {
        use super::*;

        #[test]
        fn test_new() {
            let id = KeyId::new(42);
            assert_eq!(id.as_u32(), 42);
        }

        #[test]
        fn test_display() {
            let id = KeyId::new(7);
            assert_eq!(id.to_string(), "7");
        }

        #[test]
        fn test_from_str() {
            let id: KeyId = "123".parse().unwrap();
            assert_eq!(id.as_u32(), 123);
        }

        #[test]
        fn test_from_str_invalid() {
            let result: Result<KeyId, _> = "not-a-number".parse();
            assert!(result.is_err());

            let result: Result<KeyId, _> = "-5".parse();
            assert!(result.is_err());
        }

        #[test]
        fn test_ordering() {
            assert!(KeyId::new(3) < KeyId::new(10));
        }

        #[test]
        fn test_serde_roundtrip() {
            let id = KeyId::new(300);
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, "300");
            let parsed: KeyId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, parsed);
        }
    }

    mod entry_id_tests {
        use super::*;

        #[test]
        fn test_new() {
            let id = EntryId::new(42);
            assert_eq!(id.as_i64(), 42);
        }

        #[test]
        fn test_display() {
            let id = EntryId::new(123);
            assert_eq!(id.to_string(), "123");
        }

        #[test]
        fn test_from_str() {
            let id: EntryId = "456".parse().unwrap();
            assert_eq!(id.as_i64(), 456);
        }

        #[test]
        fn test_from_str_invalid() {
            let result: Result<EntryId, _> = "not-a-number".parse();
            assert!(result.is_err());
        }

        #[test]
        fn test_from_i64() {
            let id: EntryId = 789i64.into();
            assert_eq!(id.as_i64(), 789);
        }
    }
}
