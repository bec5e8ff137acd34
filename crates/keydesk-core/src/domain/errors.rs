//! Domain error types
//!
//! This module defines the two error families of the custody domain:
//! validation failures raised while constructing domain values
//! (`DomainError`) and scan-processing failures raised by the custody
//! engine (`CustodyError`).

use thiserror::Error;

use super::key::KeyStatus;
use super::newtypes::{KeyId, StudentId};

/// Errors that can occur while validating domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid student badge token
    #[error("Invalid student ID: {0}")]
    InvalidStudentId(String),

    /// Invalid key identifier format
    #[error("Invalid key ID: {0}")]
    InvalidKeyId(String),

    /// Key identifier outside the configured range
    #[error("Key {key} is out of range ({first}-{last})")]
    KeyOutOfRange {
        /// The rejected key number
        key: u32,
        /// First key of the configured range
        first: u32,
        /// Last key of the configured range
        last: u32,
    },

    /// Key range where the first key exceeds the last
    #[error("Invalid key range: first {first} exceeds last {last}")]
    InvalidRange {
        /// Configured first key
        first: u32,
        /// Configured last key
        last: u32,
    },

    /// Scan input that is neither a badge nor a key number
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

/// Errors raised while processing a scan
///
/// These are the failures the front desk can observe. `Rejected`,
/// `NoSession` and `AlreadyHolding` are ordinary operating conditions;
/// `InvalidTransition` indicates an internal consistency violation and
/// `Persistence` a storage failure on the synchronous write path. In
/// every case the scan that raised the error has mutated nothing.
#[derive(Debug, Error)]
pub enum CustodyError {
    /// Scan input rejected before reaching the state machine
    #[error("{0}")]
    Rejected(#[from] DomainError),

    /// A key was scanned before any student badge
    #[error("No student ID scanned. Please scan a student ID first.")]
    NoSession,

    /// The active student already holds another key
    #[error("Student {student} already has key {key} borrowed. Return it before borrowing another key.")]
    AlreadyHolding {
        /// The student attempting the borrow
        student: StudentId,
        /// The key they still hold
        key: KeyId,
    },

    /// A cache transition that the custody state machine forbids
    ///
    /// The engine serializes scans, so this can only fire on an internal
    /// bug or corrupted state. It is not a user-correctable condition.
    #[error("Invalid key transition for key {key}: {from} -> {to}")]
    InvalidTransition {
        /// The key whose transition was rejected
        key: KeyId,
        /// Status the cache currently records
        from: KeyStatus,
        /// Status the transition tried to reach
        to: KeyStatus,
    },

    /// The synchronous store write failed; the transition was aborted
    #[error("Persistence failure: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl CustodyError {
    /// Returns true if the error indicates an internal consistency bug
    /// rather than an ordinary operating condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CustodyError::InvalidTransition { .. })
    }
}
