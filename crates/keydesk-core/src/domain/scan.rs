//! Scan input classification
//!
//! A single scanner feeds the desk both badge tokens and key numbers, so
//! raw input has to be classified before the custody engine sees it.
//! Classification order matters: the badge shape is tested first, which
//! means an 8-digit numeral is always a badge, never a key.

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::key::KeyRange;
use super::newtypes::{KeyId, StudentId};

/// A classified scan event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanInput {
    /// A student badge was scanned
    Badge(StudentId),
    /// A key fob was scanned
    Key(KeyId),
}

impl ScanInput {
    /// Classify a raw scanner string against the desk's key range
    ///
    /// Surrounding whitespace is ignored. Anything that is neither
    /// badge-shaped nor a key number inside `range` is rejected here,
    /// before any state is touched.
    ///
    /// # Errors
    /// - `DomainError::KeyOutOfRange` for a numeric scan outside `range`
    /// - `DomainError::InvalidInput` for anything else
    pub fn parse(raw: &str, range: &KeyRange) -> Result<Self, DomainError> {
        let token = raw.trim();

        if StudentId::is_valid(token) {
            return StudentId::new(token.to_string()).map(ScanInput::Badge);
        }

        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            let key: KeyId = token.parse()?;
            if !range.contains(key) {
                return Err(DomainError::KeyOutOfRange {
                    key: key.as_u32(),
                    first: range.first().as_u32(),
                    last: range.last().as_u32(),
                });
            }
            return Ok(ScanInput::Key(key));
        }

        Err(DomainError::InvalidInput(token.to_string()))
    }
}

impl std::fmt::Display for ScanInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanInput::Badge(id) => write!(f, "badge {id}"),
            ScanInput::Key(id) => write!(f, "key {id}"),
        }
    }
}
